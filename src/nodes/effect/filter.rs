//! Per-channel second-order filter shared by the equalizer bands and the isolator

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use dasp_graph::{Buffer, Input};
use tracing::warn;

/// Lowest Q handed to the coefficient calculator
const MIN_Q: f32 = 1.0e-4;

/// Response shape of a filter stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterShape {
    /// Boosts or cuts everything below the frequency
    LowShelf,
    /// Boosts or cuts everything above the frequency
    HighShelf,
    /// Bell around the frequency; gain and Q apply
    Peaking,
    /// Passes below the frequency; Q is a resonance in dB
    LowPass,
    /// Passes a band around the frequency at 0 dB peak
    BandPass,
    /// Rejects a band around the frequency
    Notch,
    /// Flat magnitude, phase shift around the frequency
    AllPass,
}

/// Parameters of one filter stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FilterParams {
    pub shape: FilterShape,
    pub frequency: f32,
    pub q: f32,
    pub gain_db: f32,
}

impl FilterParams {
    fn coefficients(&self, sample_rate: u32) -> Result<Coefficients<f32>, biquad::Errors> {
        let fs = sample_rate as f32;
        // Keep strictly below Nyquist and above DC
        let f0 = self.frequency.clamp(1.0, fs * 0.499);
        let q = self.q.max(MIN_Q);

        let (kind, q) = match self.shape {
            FilterShape::LowShelf => (Type::LowShelf(self.gain_db), q),
            FilterShape::HighShelf => (Type::HighShelf(self.gain_db), q),
            FilterShape::Peaking => (Type::PeakingEQ(self.gain_db), q),
            // Low-pass resonance is specified in dB
            FilterShape::LowPass => (Type::LowPass, 10f32.powf(self.q / 20.0).max(MIN_Q)),
            FilterShape::BandPass => (Type::BandPass, q),
            FilterShape::Notch => (Type::Notch, q),
            FilterShape::AllPass => (Type::AllPass, q),
        };

        Coefficients::<f32>::from_params(kind, fs.hz(), f0.hz(), q)
    }
}

/// One biquad per channel, all sharing the same parameters.
pub(crate) struct ChannelFilters {
    params: FilterParams,
    sample_rate: u32,
    stages: Vec<DirectForm2Transposed<f32>>,
}

impl ChannelFilters {
    pub fn new(params: FilterParams, channels: usize) -> Self {
        // Identity until the first block tells us the sample rate
        let identity = Coefficients {
            a1: 0.0,
            a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        };
        Self {
            params,
            sample_rate: 0,
            stages: (0..channels.max(1))
                .map(|_| DirectForm2Transposed::<f32>::new(identity))
                .collect(),
        }
    }

    #[inline]
    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Replace parameters; takes effect on the next `prepare`.
    pub fn set_params(&mut self, params: FilterParams) {
        if params != self.params {
            self.params = params;
            // Force a coefficient refresh
            self.sample_rate = 0;
        }
    }

    /// Recompute coefficients if the parameters or sample rate changed.
    pub fn prepare(&mut self, sample_rate: u32) {
        if self.sample_rate == sample_rate {
            return;
        }
        self.sample_rate = sample_rate;

        match self.params.coefficients(sample_rate) {
            Ok(coeffs) if is_finite(&coeffs) => {
                for stage in self.stages.iter_mut() {
                    stage.update_coefficients(coeffs);
                }
            }
            Ok(_) => warn!(params = ?self.params, "filter coefficients not finite, keeping previous"),
            Err(err) => warn!(params = ?self.params, ?err, "filter coefficients refused, keeping previous"),
        }
    }

    /// Filter the first input into `outputs`, channel by channel.
    pub fn run(&mut self, inputs: &[Input], outputs: &mut [Buffer]) {
        let Some(input) = inputs.first() else {
            silence(outputs);
            return;
        };
        self.filter(input.buffers(), outputs);
    }

    /// Filter `in_buffers` into `outputs`, channel by channel.
    fn filter(&mut self, in_buffers: &[Buffer], outputs: &mut [Buffer]) {
        if in_buffers.is_empty() {
            silence(outputs);
            return;
        }

        let last_stage = self.stages.len() - 1;
        for (ch, out_buffer) in outputs.iter_mut().enumerate() {
            // Reuse the last input channel when upmixing
            let in_buffer = &in_buffers[ch.min(in_buffers.len() - 1)];
            let stage = &mut self.stages[ch.min(last_stage)];

            for (out_sample, &in_sample) in out_buffer.iter_mut().zip(in_buffer.iter()) {
                *out_sample = stage.run(in_sample);
            }

            // A blown-up stage would otherwise stay NaN forever
            if out_buffer.iter().any(|s| !s.is_finite()) {
                stage.reset_state();
                out_buffer.iter_mut().for_each(|s| *s = 0.0);
            }
        }
    }
}

fn is_finite(c: &Coefficients<f32>) -> bool {
    [c.a1, c.a2, c.b0, c.b1, c.b2].iter().all(|v| v.is_finite())
}

pub(crate) fn silence(outputs: &mut [Buffer]) {
    for buffer in outputs.iter_mut() {
        buffer.iter_mut().for_each(|s| *s = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(shape: FilterShape, frequency: f32) -> FilterParams {
        FilterParams { shape, frequency, q: 1.0, gain_db: 0.0 }
    }

    #[test]
    fn every_shape_has_coefficients_at_common_rates() {
        let shapes = [
            FilterShape::LowShelf,
            FilterShape::HighShelf,
            FilterShape::Peaking,
            FilterShape::LowPass,
            FilterShape::BandPass,
            FilterShape::Notch,
            FilterShape::AllPass,
        ];
        for rate in [22050, 44100, 48000, 96000] {
            for shape in shapes {
                assert!(params(shape, 10_000.0).coefficients(rate).is_ok(), "{:?} @ {}", shape, rate);
            }
        }
    }

    #[test]
    fn frequency_above_nyquist_is_clamped() {
        assert!(params(FilterShape::HighShelf, 10_000.0).coefficients(8000).is_ok());
    }

    #[test]
    fn zero_gain_peaking_is_transparent() {
        let c = params(FilterShape::Peaking, 1000.0).coefficients(48000).unwrap();
        assert!((c.b0 - 1.0).abs() < 1e-5);
        assert!((c.b1 - c.a1).abs() < 1e-5);
        assert!((c.b2 - c.a2).abs() < 1e-5);
    }

    fn run_block(filters: &mut ChannelFilters, input: f32) -> Buffer {
        let mut block = Buffer::default();
        block.iter_mut().for_each(|s| *s = input);
        let mut outputs = vec![Buffer::default()];
        filters.filter(std::slice::from_ref(&block), &mut outputs);
        outputs.remove(0)
    }

    #[test]
    fn overflowing_gain_keeps_previous_coefficients() {
        let flat = FilterParams { q: biquad::Q_BUTTERWORTH_F32, ..params(FilterShape::HighShelf, 10_000.0) };
        let mut filters = ChannelFilters::new(flat, 1);
        filters.prepare(48000);

        for gain_db in [1e3, f32::NAN, f32::INFINITY] {
            filters.set_params(FilterParams { gain_db, ..flat });
            filters.prepare(48000);
            assert!(run_block(&mut filters, 0.5).iter().all(|s| s.is_finite()), "{}", gain_db);
        }

        filters.set_params(flat);
        filters.prepare(48000);
        let out = run_block(&mut filters, 0.5);
        assert!((out[63] - 0.5).abs() < 1e-3, "{}", out[63]);
    }

    #[test]
    fn non_finite_output_resets_the_stage() {
        let mut filters = ChannelFilters::new(params(FilterShape::Peaking, 1000.0), 1);
        filters.prepare(48000);

        let out = run_block(&mut filters, f32::NAN);
        assert!(out.iter().all(|&s| s == 0.0));

        // State is clean again: DC through a flat peaking filter is unchanged
        let out = run_block(&mut filters, 0.5);
        assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-4));
    }
}
