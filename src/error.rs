//! Error types

use thiserror::Error;

/// Errors returned by the signal graph and its configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The host could not provide an audio engine (no device, or the
    /// platform requires a user gesture first). Retry on the next play action.
    #[error("audio engine unavailable")]
    EngineUnavailable,

    /// A filter band index outside the bank.
    #[error("band index {index} out of range (bank has {len} bands)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The media element's audio output is already routed into a graph.
    #[error("media element is already bound to a signal graph")]
    SourceAlreadyBound,

    /// Analyser window must be a power of two in [32, 32768].
    #[error("invalid analyser fft size: {0}")]
    InvalidFftSize(usize),

    /// Analyser decibel range must satisfy `min < max`.
    #[error("invalid analyser decibel range: min={min}dB, max={max}dB")]
    InvalidDecibelRange { min: f32, max: f32 },

    /// Analyser smoothing must be in [0, 1].
    #[error("invalid analyser smoothing time constant: {0}")]
    InvalidSmoothing(f32),
}

/// Result type for signal graph operations
pub type Result<T> = std::result::Result<T, Error>;
