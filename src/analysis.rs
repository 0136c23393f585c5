//! Spectrum analysis of the signal leaving the equalizer.
//!
//! The [`AnalyserTap`](crate::nodes::AnalyserTap) node pushes a mono down-mix
//! of every block into a ring buffer; [`AnalysisTap`] reads it on the control
//! side and turns the most recent window into byte magnitudes, the same scale
//! a browser `AnalyserNode` reports:
//!
//! 1. Blackman window over the last `fft_size` samples
//! 2. Forward FFT, magnitude divided by `fft_size`
//! 3. Exponential smoothing against the previous magnitudes
//! 4. Decibels, mapped linearly from `[min_decibels, max_decibels]` onto `0..=255`

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::ops::Deref;
use std::sync::Arc;

use rtrb::Consumer;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tracing::trace;

use crate::error::{Error, Result};

/// Window length used unless configured otherwise
pub const DEFAULT_FFT_SIZE: usize = 256;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// Analyser settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyserConfig {
    /// Window length in samples; a power of two in `32..=32768`
    pub fft_size: usize,
    /// Weight of the previous magnitudes, `0.0..=1.0`
    pub smoothing_time_constant: f32,
    /// Level mapped to byte 0
    pub min_decibels: f32,
    /// Level mapped to byte 255
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size) {
            return Err(Error::InvalidFftSize(self.fft_size));
        }
        // Written so NaN fails too
        if !(self.min_decibels < self.max_decibels) {
            return Err(Error::InvalidDecibelRange {
                min: self.min_decibels,
                max: self.max_decibels,
            });
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(Error::InvalidSmoothing(self.smoothing_time_constant));
        }
        Ok(())
    }

    #[inline]
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Byte magnitude per frequency bin, lowest bin first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnergySnapshot(Vec<u8>);

impl EnergySnapshot {
    #[inline]
    pub fn bins(&self) -> usize {
        self.0.len()
    }
}

impl Deref for EnergySnapshot {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for EnergySnapshot {
    fn from(bins: Vec<u8>) -> Self {
        Self(bins)
    }
}

/// Reader side of the analysis stage.
///
/// [`SignalGraph::process`](crate::SignalGraph::process) drains the node's
/// ring after every block, so the window always holds the newest audio no
/// matter how rarely snapshots are taken.
pub struct AnalysisTap {
    config: AnalyserConfig,
    consumer: Consumer<f32>,

    /// Most recent `fft_size` samples, oldest first
    history: VecDeque<f32>,
    /// Samples moved into `history` since the last analysis
    unanalysed: usize,
    blackman: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    smoothed: Vec<f32>,

    snapshot: EnergySnapshot,
}

impl AnalysisTap {
    /// `config` must already be validated.
    pub(crate) fn new(consumer: Consumer<f32>, config: AnalyserConfig) -> Self {
        let n = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(n);

        let blackman = (0..n)
            .map(|i| {
                let x = i as f32 / n as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        Self {
            consumer,
            history: core::iter::repeat(0.0).take(n).collect(),
            unanalysed: 0,
            blackman,
            fft,
            spectrum: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
            snapshot: EnergySnapshot(vec![0; n / 2]),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    #[inline]
    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    /// Move everything the node produced into the window.
    pub(crate) fn pull(&mut self) {
        let n = self.config.fft_size;
        while let Ok(sample) = self.consumer.pop() {
            if self.history.len() == n {
                self.history.pop_front();
            }
            self.history.push_back(sample);
            self.unanalysed += 1;
        }
    }

    /// Current magnitudes, recomputed if new audio arrived since the last call.
    pub fn snapshot(&mut self) -> &EnergySnapshot {
        self.pull();
        if self.unanalysed > 0 {
            trace!(fresh = self.unanalysed, "analysis refresh");
            self.unanalysed = 0;
            self.analyse();
        }
        &self.snapshot
    }

    /// Copy the current magnitudes into `out` (as many as fit).
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let snapshot = self.snapshot();
        let len = out.len().min(snapshot.len());
        out[..len].copy_from_slice(&snapshot[..len]);
    }

    /// Copy the current waveform into `out` as bytes, 128 being silence.
    pub fn byte_time_domain_data(&mut self, out: &mut [u8]) {
        self.pull();
        for (byte, &sample) in out.iter_mut().zip(self.history.iter()) {
            *byte = (128.0 * (1.0 + sample)).floor().clamp(0.0, 255.0) as u8;
        }
    }

    fn analyse(&mut self) {
        let n = self.config.fft_size;
        for ((bin, &sample), &w) in self.spectrum.iter_mut().zip(self.history.iter()).zip(self.blackman.iter()) {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let tau = self.config.smoothing_time_constant;
        let min_db = self.config.min_decibels;
        let scale = 255.0 / (self.config.max_decibels - min_db);

        for ((smoothed, byte), bin) in self
            .smoothed
            .iter_mut()
            .zip(self.snapshot.0.iter_mut())
            .zip(self.spectrum.iter())
        {
            let magnitude = bin.norm() / n as f32;
            let value = tau * *smoothed + (1.0 - tau) * magnitude;
            // Keep the state finite so silence can recover
            *smoothed = if value.is_finite() { value } else { 0.0 };

            let db = 20.0 * smoothed.log10();
            // -inf for silence lands on 0 through the clamp
            *byte = (scale * (db - min_db)).floor().clamp(0.0, 255.0) as u8;
        }
    }
}
