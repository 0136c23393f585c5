//! Instrument presence from spectrum energy.
//!
//! Four hand-picked bin ranges of the 128-bin snapshot are averaged and
//! compared against fixed byte thresholds.

use std::ops::Range;

/// Bins averaged for the bass flag
pub const BASS_BINS: Range<usize> = 0..3;
/// Bins averaged for the kick flag
pub const KICK_BINS: Range<usize> = 0..1;
/// Bins averaged for the vocal flag
pub const VOCAL_BINS: Range<usize> = 3..10;
/// Bins averaged for the high flag
pub const HIGH_BINS: Range<usize> = 30..60;

pub const BASS_THRESHOLD: f32 = 180.0;
pub const KICK_THRESHOLD: f32 = 210.0;
pub const VOCAL_THRESHOLD: f32 = 140.0;
pub const HIGH_THRESHOLD: f32 = 100.0;

/// Mean of `snapshot[range]`, with the range cut to the snapshot's length.
///
/// A range that falls entirely outside the snapshot averages to 0.
pub fn band_average(snapshot: &[u8], range: Range<usize>) -> f32 {
    let end = range.end.min(snapshot.len());
    let start = range.start.min(end);
    let bins = &snapshot[start..end];
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().map(|&b| b as u32).sum::<u32>() as f32 / bins.len() as f32
}

/// Which instrument groups currently carry energy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InstrumentFlags {
    pub bass: bool,
    pub kick: bool,
    pub vocal: bool,
    pub high: bool,
}

impl InstrumentFlags {
    /// Classify one snapshot.
    ///
    /// ```
    /// use klangbild::InstrumentFlags;
    ///
    /// let mut bins = [0u8; 128];
    /// bins[0] = 255;
    /// let flags = InstrumentFlags::from_snapshot(&bins);
    /// assert!(flags.kick);
    /// assert!(!flags.bass); // (255 + 0 + 0) / 3 = 85
    /// ```
    pub fn from_snapshot(snapshot: &[u8]) -> Self {
        Self {
            bass: band_average(snapshot, BASS_BINS) > BASS_THRESHOLD,
            kick: band_average(snapshot, KICK_BINS) > KICK_THRESHOLD,
            vocal: band_average(snapshot, VOCAL_BINS) > VOCAL_THRESHOLD,
            high: band_average(snapshot, HIGH_BINS) > HIGH_THRESHOLD,
        }
    }

    pub fn any(&self) -> bool {
        self.bass || self.kick || self.vocal || self.high
    }
}

/// Keeps the last classification so a renderer can react to changes only.
///
/// Flags hold their value between updates; nothing clears them when audio
/// stops.
#[derive(Clone, Debug, Default)]
pub struct InstrumentDetector {
    flags: InstrumentFlags,
}

impl InstrumentDetector {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn flags(&self) -> InstrumentFlags {
        self.flags
    }

    /// Classify `snapshot`; returns the flags and whether they differ from before.
    pub fn update(&mut self, snapshot: &[u8]) -> (InstrumentFlags, bool) {
        let flags = InstrumentFlags::from_snapshot(snapshot);
        let changed = flags != self.flags;
        self.flags = flags;
        (flags, changed)
    }
}
