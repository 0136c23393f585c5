//! Six-band graphic equalizer.

use tracing::debug;

use crate::engine::{Engine, Handle};
use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::nodes::{EqBand, EqBandMessage, FilterShape};

/// Number of equalizer bands
pub const BAND_COUNT: usize = 6;

/// Center frequencies of the bands, low to high
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [60.0, 250.0, 500.0, 1000.0, 4000.0, 10000.0];

/// Q of the peaking bands
pub const PEAKING_Q: f32 = 1.0;

/// Q of the two shelves: the cookbook slope S = 1
pub const SHELF_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// One band's fixed layout plus its current gain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSpec {
    pub frequency: f32,
    pub shape: FilterShape,
    pub q: f32,
    pub gain_db: f32,
}

impl FilterSpec {
    /// Layout of band `index`: low shelf first, high shelf last, peaking between.
    fn for_band(index: usize) -> Self {
        let (shape, q) = match index {
            0 => (FilterShape::LowShelf, SHELF_Q),
            i if i == BAND_COUNT - 1 => (FilterShape::HighShelf, SHELF_Q),
            _ => (FilterShape::Peaking, PEAKING_Q),
        };
        Self {
            frequency: BAND_FREQUENCIES[index],
            shape,
            q,
            gain_db: 0.0,
        }
    }
}

/// Control side of the equalizer stage.
///
/// Gains are not range checked: whatever the caller passes is applied
/// verbatim (a UI would normally limit sliders to ±12 dB). Changes made
/// before the graph exists are kept and applied when the bands are created.
///
/// ```
/// use klangbild::FilterBank;
///
/// let mut bank = FilterBank::new();
/// bank.set_band_gain(0, 6.0).unwrap();
/// assert!(bank.set_band_gain(6, 0.0).is_err());
///
/// bank.reset_all();
/// assert_eq!(bank.gains(), [0.0; 6]);
/// ```
pub struct FilterBank {
    specs: [FilterSpec; BAND_COUNT],
    bands: Vec<Handle<EqBandMessage>>,
}

impl FilterBank {
    pub fn new() -> Self {
        Self {
            specs: core::array::from_fn(FilterSpec::for_band),
            bands: Vec::with_capacity(BAND_COUNT),
        }
    }

    /// Layout and gain of every band, low to high
    #[inline]
    pub fn specs(&self) -> &[FilterSpec; BAND_COUNT] {
        &self.specs
    }

    /// Gain of band `index`, if it exists
    pub fn gain(&self, index: usize) -> Option<f32> {
        self.specs.get(index).map(|s| s.gain_db)
    }

    pub fn gains(&self) -> [f32; BAND_COUNT] {
        self.specs.map(|s| s.gain_db)
    }

    /// Set the gain of band `index` in dB, effective on the next block.
    ///
    /// Fails with [`Error::IndexOutOfRange`] for `index >= 6`, leaving every
    /// band untouched.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        let spec = self.specs.get_mut(index).ok_or(Error::IndexOutOfRange {
            index,
            len: BAND_COUNT,
        })?;
        spec.gain_db = gain_db;

        if let Some(band) = self.bands.get_mut(index) {
            band.send_or_warn(EqBandMessage::SetGain(gain_db), "band gain");
        }
        Ok(())
    }

    /// Flatten all bands to 0 dB.
    pub fn reset_all(&mut self) {
        debug!("equalizer reset");
        for spec in self.specs.iter_mut() {
            spec.gain_db = 0.0;
        }
        // All six go out before any block runs, so they land together
        for band in self.bands.iter_mut() {
            band.send_or_warn(EqBandMessage::SetGain(0.0), "band gain");
        }
    }

    /// Whether the band nodes have been created
    #[inline]
    pub fn is_attached(&self) -> bool {
        !self.bands.is_empty()
    }

    /// Create the six band nodes in `engine`, low to high.
    pub(crate) fn attach(&mut self, engine: &mut Engine, queue_size: usize) -> Vec<NodeId> {
        let channels = engine.channels();
        self.bands = self
            .specs
            .iter()
            .map(|s| {
                let band = EqBand::new(s.shape, s.frequency, s.q, s.gain_db, channels);
                engine.add_with_queue_size(band, queue_size)
            })
            .collect();
        self.bands.iter().map(Handle::id).collect()
    }
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new()
    }
}
