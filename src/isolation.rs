//! Stem isolation modes and their filter.
//!
//! "Isolation" here is a coarse single-filter approximation: each mode picks a
//! filter shape, a target frequency and a Q that emphasise one instrument group.

use std::fmt;

use tracing::debug;

use crate::engine::{Engine, Handle};
use crate::node::NodeId;
use crate::nodes::{FilterShape, Isolator, IsolatorMessage};

/// Time constant (seconds) of the frequency glide between modes
pub const MODE_TIME_CONSTANT: f32 = 0.1;

/// How the isolator frequency moves to a new target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrequencyRamp {
    /// Jump straight to the target
    Immediate,
    /// Approach the target exponentially
    Target { time_constant: f32 },
}

/// Filter configuration realised for one [`IsolationMode`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModeConfig {
    pub shape: FilterShape,
    pub frequency: f32,
    pub q: f32,
    pub ramp: FrequencyRamp,
}

/// Which instrument group the isolator emphasises.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IsolationMode {
    /// No isolation: an all-pass filter, audibly transparent
    #[default]
    Normal,
    Bass,
    Drums,
    Vocals,
    Mids,
}

impl IsolationMode {
    pub const ALL: [IsolationMode; 5] = [
        IsolationMode::Normal,
        IsolationMode::Bass,
        IsolationMode::Drums,
        IsolationMode::Vocals,
        IsolationMode::Mids,
    ];

    /// The fixed filter configuration of this mode.
    pub fn config(self) -> ModeConfig {
        let glide = FrequencyRamp::Target { time_constant: MODE_TIME_CONSTANT };
        match self {
            IsolationMode::Normal => ModeConfig {
                shape: FilterShape::AllPass,
                frequency: 350.0,
                q: 1.0,
                ramp: FrequencyRamp::Immediate,
            },
            IsolationMode::Bass => ModeConfig {
                shape: FilterShape::LowPass,
                frequency: 200.0,
                q: 1.0,
                ramp: glide,
            },
            IsolationMode::Drums => ModeConfig {
                shape: FilterShape::Notch,
                frequency: 500.0,
                q: 0.5,
                ramp: glide,
            },
            IsolationMode::Vocals => ModeConfig {
                shape: FilterShape::BandPass,
                frequency: 1000.0,
                q: 0.8,
                ramp: glide,
            },
            IsolationMode::Mids => ModeConfig {
                shape: FilterShape::BandPass,
                frequency: 2500.0,
                q: 1.0,
                ramp: glide,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IsolationMode::Normal => "normal",
            IsolationMode::Bass => "bass",
            IsolationMode::Drums => "drums",
            IsolationMode::Vocals => "vocals",
            IsolationMode::Mids => "mids",
        }
    }
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Control side of the isolation stage.
///
/// Remembers the selected mode and forwards changes to the [`Isolator`] node
/// once the graph exists. A mode chosen before that is applied when the node
/// is created.
pub struct ModeFilter {
    mode: IsolationMode,
    handle: Option<Handle<IsolatorMessage>>,
}

impl ModeFilter {
    pub fn new() -> Self {
        Self {
            mode: IsolationMode::default(),
            handle: None,
        }
    }

    #[inline]
    pub fn mode(&self) -> IsolationMode {
        self.mode
    }

    /// Configuration of the active mode
    #[inline]
    pub fn config(&self) -> ModeConfig {
        self.mode.config()
    }

    /// Whether the isolator node has been created
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Switch modes. Any glide still running is cancelled by the node.
    pub fn set_mode(&mut self, mode: IsolationMode) {
        debug!(from = %self.mode, to = %mode, "isolation mode");
        self.mode = mode;
        if let Some(handle) = self.handle.as_mut() {
            handle.send_or_warn(IsolatorMessage::Configure(mode.config()), "isolation");
        }
    }

    /// Create the isolator node in `engine`, settled on the current mode.
    pub(crate) fn attach(&mut self, engine: &mut Engine, queue_size: usize) -> NodeId {
        let node = Isolator::new(self.mode.config(), engine.channels());
        let handle = engine.add_with_queue_size(node, queue_size);
        let id = handle.id();
        self.handle = Some(handle);
        id
    }
}

impl Default for ModeFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_has_its_tuple() {
        let expected = [
            (IsolationMode::Normal, FilterShape::AllPass, 350.0, 1.0),
            (IsolationMode::Bass, FilterShape::LowPass, 200.0, 1.0),
            (IsolationMode::Drums, FilterShape::Notch, 500.0, 0.5),
            (IsolationMode::Vocals, FilterShape::BandPass, 1000.0, 0.8),
            (IsolationMode::Mids, FilterShape::BandPass, 2500.0, 1.0),
        ];
        for (mode, shape, frequency, q) in expected {
            let c = mode.config();
            assert_eq!((c.shape, c.frequency, c.q), (shape, frequency, q), "{}", mode);
        }
    }

    #[test]
    fn only_normal_jumps() {
        for mode in IsolationMode::ALL {
            let immediate = mode.config().ramp == FrequencyRamp::Immediate;
            assert_eq!(immediate, mode == IsolationMode::Normal, "{}", mode);
        }
    }

    #[test]
    fn last_mode_selected_is_observed() {
        let mut filter = ModeFilter::new();
        assert_eq!(filter.mode(), IsolationMode::Normal);
        assert!(!filter.is_attached());

        filter.set_mode(IsolationMode::Drums);
        filter.set_mode(IsolationMode::Vocals);
        assert_eq!(filter.mode(), IsolationMode::Vocals);
        assert_eq!(filter.config(), IsolationMode::Vocals.config());
    }
}
