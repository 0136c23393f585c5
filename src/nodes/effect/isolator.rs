//! Stem isolation filter

use dasp_graph::{Buffer, Input};

use super::filter::{ChannelFilters, FilterParams, FilterShape};
use crate::isolation::{FrequencyRamp, ModeConfig};
use crate::node::{AudioNode, ProcessContext};

/// Distance (Hz) at which a frequency ramp snaps onto its target
const RAMP_SNAP_HZ: f32 = 0.01;

/// Messages to control an [`Isolator`]
#[derive(Clone, Copy, Debug)]
pub enum IsolatorMessage {
    /// Cancel any running frequency ramp and switch to a new configuration.
    Configure(ModeConfig),
}

/// A single reconfigurable filter that approximates isolating an instrument group.
///
/// Shape and Q change immediately; frequency either jumps or approaches its
/// target exponentially, evaluated once per block.
pub struct Isolator {
    filters: ChannelFilters,
    target_frequency: f32,
    ramp: FrequencyRamp,
    channels: usize,
}

impl Isolator {
    /// Create an isolator already settled on `config`
    pub fn new(config: ModeConfig, channels: usize) -> Self {
        let params = FilterParams {
            shape: config.shape,
            frequency: config.frequency,
            q: config.q,
            gain_db: 0.0,
        };
        Self {
            filters: ChannelFilters::new(params, channels),
            target_frequency: config.frequency,
            ramp: FrequencyRamp::Immediate,
            channels: channels.max(1),
        }
    }

    #[inline]
    pub fn shape(&self) -> FilterShape {
        self.filters.params().shape
    }

    /// Current (possibly still ramping) frequency in Hz
    #[inline]
    pub fn frequency(&self) -> f32 {
        self.filters.params().frequency
    }

    #[inline]
    pub fn target_frequency(&self) -> f32 {
        self.target_frequency
    }

    #[inline]
    pub fn q(&self) -> f32 {
        self.filters.params().q
    }

    fn configure(&mut self, config: ModeConfig) {
        // Whatever was ramping stops where it is
        let current = *self.filters.params();
        let frequency = match config.ramp {
            FrequencyRamp::Immediate => config.frequency,
            FrequencyRamp::Target { .. } => current.frequency,
        };

        self.target_frequency = config.frequency;
        self.ramp = config.ramp;
        self.filters.set_params(FilterParams {
            shape: config.shape,
            frequency,
            q: config.q,
            gain_db: current.gain_db,
        });
    }

    fn advance_ramp(&mut self, ctx: &ProcessContext) {
        let FrequencyRamp::Target { time_constant } = self.ramp else { return };

        let current = *self.filters.params();
        if current.frequency == self.target_frequency {
            return;
        }

        let decay = if time_constant > 0.0 {
            (-(ctx.block_duration() as f32) / time_constant).exp()
        } else {
            0.0
        };
        let mut next = self.target_frequency + (current.frequency - self.target_frequency) * decay;
        if (next - self.target_frequency).abs() < RAMP_SNAP_HZ {
            next = self.target_frequency;
        }

        self.filters.set_params(FilterParams { frequency: next, ..current });
    }
}

impl AudioNode for Isolator {
    type Message = IsolatorMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = IsolatorMessage>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                IsolatorMessage::Configure(config) => self.configure(config),
            }
        }

        self.advance_ramp(ctx);
        self.filters.prepare(ctx.sample_rate);
        self.filters.run(inputs, outputs);
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { self.channels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolation::IsolationMode;

    const CTX: ProcessContext = ProcessContext { sample_rate: 48000, buffer_size: 64 };

    fn step(iso: &mut Isolator, msg: Option<IsolatorMessage>) {
        let mut outputs = vec![Buffer::default(); 2];
        iso.process(&CTX, msg.into_iter(), &[], &mut outputs);
    }

    #[test]
    fn shape_and_q_switch_immediately_frequency_glides() {
        let mut iso = Isolator::new(IsolationMode::Normal.config(), 2);
        step(&mut iso, Some(IsolatorMessage::Configure(IsolationMode::Bass.config())));

        assert_eq!(iso.shape(), FilterShape::LowPass);
        assert_eq!(iso.q(), 1.0);
        assert_eq!(iso.target_frequency(), 200.0);
        // One block into a 0.1s time constant: still close to the old value
        assert!(iso.frequency() > 340.0 && iso.frequency() < 350.0, "{}", iso.frequency());

        // ~1s later the glide has settled
        for _ in 0..750 {
            step(&mut iso, None);
        }
        assert_eq!(iso.frequency(), 200.0);
    }

    #[test]
    fn glide_follows_time_constant() {
        let mut iso = Isolator::new(IsolationMode::Normal.config(), 1);
        step(&mut iso, Some(IsolatorMessage::Configure(IsolationMode::Mids.config())));

        // 75 blocks of 64 frames at 48k = 0.1s, one time constant in total
        for _ in 0..74 {
            step(&mut iso, None);
        }
        let expected = 2500.0 + (350.0 - 2500.0) * (-1.0f32).exp();
        assert!((iso.frequency() - expected).abs() < 1.0, "{} vs {}", iso.frequency(), expected);
    }

    #[test]
    fn new_mode_cancels_running_glide() {
        let mut iso = Isolator::new(IsolationMode::Normal.config(), 2);
        step(&mut iso, Some(IsolatorMessage::Configure(IsolationMode::Mids.config())));
        for _ in 0..40 {
            step(&mut iso, None);
        }
        let mid_glide = iso.frequency();

        step(&mut iso, Some(IsolatorMessage::Configure(IsolationMode::Vocals.config())));
        assert_eq!(iso.target_frequency(), 1000.0);
        assert_eq!(iso.shape(), FilterShape::BandPass);
        assert_eq!(iso.q(), 0.8);
        // Picks up from where the cancelled glide stopped, heading down to 1k
        assert!(iso.frequency() < mid_glide);
        assert!(iso.frequency() > 1000.0);

        for _ in 0..1000 {
            step(&mut iso, None);
        }
        assert_eq!(iso.frequency(), 1000.0);
    }

    #[test]
    fn normal_jumps_without_glide() {
        let mut iso = Isolator::new(IsolationMode::Drums.config(), 2);
        step(&mut iso, Some(IsolatorMessage::Configure(IsolationMode::Normal.config())));
        assert_eq!(iso.shape(), FilterShape::AllPass);
        assert_eq!(iso.frequency(), 350.0);
        assert_eq!(iso.q(), 1.0);
    }
}
