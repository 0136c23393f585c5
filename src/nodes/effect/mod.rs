//! Audio effect nodes (processors with audio inputs and outputs)

mod analyser_tap;
mod eq_band;
mod filter;
mod isolator;

pub use analyser_tap::AnalyserTap;
pub use eq_band::{EqBand, EqBandMessage};
pub use filter::FilterShape;
pub use isolator::{Isolator, IsolatorMessage};

pub(crate) use filter::silence;
