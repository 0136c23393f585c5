//! One band of the graphic equalizer

use dasp_graph::{Buffer, Input};

use super::filter::{ChannelFilters, FilterParams, FilterShape};
use crate::node::{AudioNode, ProcessContext};

/// Messages to control an [`EqBand`]
#[derive(Clone, Copy, Debug)]
pub enum EqBandMessage {
    /// Set the band gain in dB. Applied as-is on the next block, no smoothing.
    SetGain(f32),
}

/// A fixed-frequency filter with adjustable gain.
///
/// Frequency, shape and Q are fixed at construction; only the gain changes.
pub struct EqBand {
    filters: ChannelFilters,
    channels: usize,
}

impl EqBand {
    /// Create a band at `frequency` Hz with the given shape, Q and initial gain
    pub fn new(shape: FilterShape, frequency: f32, q: f32, gain_db: f32, channels: usize) -> Self {
        let params = FilterParams { shape, frequency, q, gain_db };
        Self {
            filters: ChannelFilters::new(params, channels),
            channels: channels.max(1),
        }
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.filters.params().gain_db
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.filters.params().frequency
    }
}

impl AudioNode for EqBand {
    type Message = EqBandMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = EqBandMessage>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                EqBandMessage::SetGain(g) => {
                    let params = FilterParams { gain_db: g, ..*self.filters.params() };
                    self.filters.set_params(params);
                }
            }
        }

        self.filters.prepare(ctx.sample_rate);
        self.filters.run(inputs, outputs);
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { self.channels }
}
