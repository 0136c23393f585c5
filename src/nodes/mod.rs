//! Built-in audio nodes.
//!
//! Nodes are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! - [`MediaSource`] - Plays a [`MediaElement`](crate::MediaElement)'s decoded samples
//!
//! ## Effects ([`effect`])
//!
//! Process audio (inputs → outputs):
//! - [`Isolator`] - Reconfigurable filter used for stem isolation
//! - [`EqBand`] - One fixed-frequency band of the equalizer
//! - [`AnalyserTap`] - Pass-through that feeds the spectrum analyser
//!
//! ## Sinks ([`sink`])
//!
//! Consume audio with no audio outputs:
//! - [`CpalSink`] - Output to system audio device (requires `cpal_sink` feature)
//! - [`RtrbSink`] - Write interleaved frames to a ring buffer (offline rendering)
//!
//! # Message Types
//!
//! - [`PlayerMessage`] - Control [`MediaSource`] playback (play/pause/seek)
//! - [`IsolatorMessage`] - Reconfigure an [`Isolator`]
//! - [`EqBandMessage`] - Set an [`EqBand`] gain
//!
//! Nodes without parameters (like [`AnalyserTap`]) use `()` as their message type.

pub mod source;
pub mod effect;
pub mod sink;

// Re-export common types at the top level for convenience
pub use source::{MediaEvent, MediaSource, PlayerMessage};
pub use effect::{AnalyserTap, EqBand, EqBandMessage, FilterShape, Isolator, IsolatorMessage};
pub use sink::RtrbSink;

#[cfg(feature = "cpal_sink")]
pub use sink::CpalSink;
