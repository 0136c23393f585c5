//! Per-frame driver for instrument badges.

use tracing::debug;

use crate::detector::{InstrumentDetector, InstrumentFlags};
use crate::host::Host;
use crate::signal_graph::SignalGraph;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopState {
    Stopped,
    Running,
}

/// Outcome of one [`Visualizer::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Nothing to draw: not playing, or no graph yet
    Idle,
    Frame {
        flags: InstrumentFlags,
        /// Whether `flags` differ from the previous frame
        changed: bool,
    },
}

/// Call [`tick`](Self::tick) once per display refresh.
///
/// The loop runs only while playback is active. When it stops, the last
/// flags stay as they were.
#[derive(Debug)]
pub struct Visualizer {
    detector: InstrumentDetector,
    state: LoopState,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            detector: InstrumentDetector::new(),
            state: LoopState::Stopped,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Flags from the most recent frame.
    #[inline]
    pub fn flags(&self) -> InstrumentFlags {
        self.detector.flags()
    }

    pub fn tick<H: Host>(&mut self, graph: &mut SignalGraph<H>, is_playing: bool) -> Tick {
        if !is_playing {
            if self.state == LoopState::Running {
                debug!(flags = ?self.detector.flags(), "render loop stopped");
                self.state = LoopState::Stopped;
            }
            return Tick::Idle;
        }

        let Some(snapshot) = graph.analysis_snapshot() else {
            return Tick::Idle;
        };
        if self.state == LoopState::Stopped {
            debug!("render loop started");
            self.state = LoopState::Running;
        }

        let (flags, changed) = self.detector.update(snapshot);
        Tick::Frame { flags, changed }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::OfflineHost;
    use crate::media::MediaElement;

    #[test]
    fn idle_without_graph_or_playback() {
        let mut graph = SignalGraph::new(OfflineHost::new(48000));
        let mut vis = Visualizer::new();

        assert_eq!(vis.tick(&mut graph, true), Tick::Idle);
        assert!(!vis.is_running());

        let mut media = MediaElement::new(vec![0.0; 480], 1, 48000);
        graph.ensure_constructed(&mut media).unwrap();
        assert_eq!(vis.tick(&mut graph, false), Tick::Idle);
    }

    #[test]
    fn silent_frames_and_stop() {
        let mut graph = SignalGraph::new(OfflineHost::new(48000));
        let mut media = MediaElement::new(vec![0.0; 480], 1, 48000);
        graph.ensure_constructed(&mut media).unwrap();
        graph.process();

        let mut vis = Visualizer::new();
        assert_eq!(
            vis.tick(&mut graph, true),
            Tick::Frame { flags: InstrumentFlags::default(), changed: false }
        );
        assert!(vis.is_running());

        assert_eq!(vis.tick(&mut graph, false), Tick::Idle);
        assert!(!vis.is_running());
    }
}
