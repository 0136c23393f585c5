//! Klangbild - the signal path of a music player with equalizer, stem
//! isolation and instrument detection
//!
//! Design principles:
//! - The graph is built lazily, on first playback, and only if the host allows it
//! - Nodes receive parameters via message ring buffers, not shared state
//! - Callers talk to [`SignalGraph`]; nodes are never reached directly
//! - Settings made before the graph exists are kept and applied when it is built
//!
//! ```
//! use klangbild::{IsolationMode, MediaElement, OfflineHost, SignalGraph, Visualizer, Tick};
//!
//! let mut graph = SignalGraph::new(OfflineHost::new(48000).require_gesture());
//! let mut media = MediaElement::new(vec![0.0; 96000], 2, 48000);
//! let mut visualizer = Visualizer::new();
//!
//! // No gesture yet: the host refuses, nothing is built
//! media.play();
//! graph.sync_playback(&mut media);
//! assert!(!graph.is_ready());
//!
//! graph.host_mut().grant_gesture();
//! graph.sync_playback(&mut media);
//! assert!(graph.is_ready());
//!
//! graph.set_band_gain(0, 6.0).unwrap();
//! graph.set_mode(IsolationMode::Vocals);
//!
//! graph.process();
//! assert!(matches!(visualizer.tick(&mut graph, media.is_playing()), Tick::Frame { .. }));
//! ```

mod node;
mod graph;
mod engine;
mod error;
mod host;
#[cfg(feature = "cpal_sink")]
mod device;
mod media;
mod filter_bank;
mod isolation;
mod analysis;
mod detector;
mod signal_graph;
mod visualizer;
pub mod nodes;

pub use node::{AudioNode, ProcessContext, NodeId};
pub use graph::BLOCK_SIZE;
pub use engine::{Engine, EngineState, Handle, DEFAULT_QUEUE_SIZE};
pub use error::{Error, Result};
pub use host::{Host, OfflineHost};
#[cfg(feature = "cpal_sink")]
pub use host::CpalHost;
#[cfg(feature = "cpal_sink")]
pub use device::CpalDevice;
pub use media::{MediaElement, MediaId};
pub use nodes::{FilterShape, MediaEvent};
pub use filter_bank::{FilterBank, FilterSpec, BAND_COUNT, BAND_FREQUENCIES, PEAKING_Q, SHELF_Q};
pub use isolation::{FrequencyRamp, IsolationMode, ModeConfig, ModeFilter};
pub use analysis::{AnalyserConfig, AnalysisTap, EnergySnapshot};
pub use detector::{band_average, InstrumentDetector, InstrumentFlags};
pub use signal_graph::{GraphConfig, SignalGraph};
pub use visualizer::{Tick, Visualizer};
