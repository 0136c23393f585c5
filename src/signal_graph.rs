//! The player's signal path.
//!
//! ```text
//! media -> isolator -> band 0 -> ... -> band 5 -> analyser tap -> output
//! ```
//!
//! Nothing is built until playback first starts: hosts can refuse engines
//! before a user gesture, so construction is an explicit, retryable step
//! rather than a side effect of creating the graph.

use rtrb::RingBuffer;
use tracing::{debug, info, warn};

use crate::analysis::{AnalyserConfig, AnalysisTap, EnergySnapshot};
use crate::engine::{Engine, DEFAULT_QUEUE_SIZE};
use crate::error::{Error, Result};
use crate::filter_bank::FilterBank;
use crate::host::Host;
use crate::isolation::{IsolationMode, ModeFilter};
use crate::media::{MediaElement, MediaId};
use crate::node::NodeId;
use crate::nodes::AnalyserTap;

/// Smallest analyser ring, in samples
const MIN_ANALYSER_RING: usize = 8192;

/// Settings fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphConfig {
    pub analyser: AnalyserConfig,
    /// Capacity of each node's control message queue
    pub queue_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            analyser: AnalyserConfig::default(),
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

/// Everything that exists once the graph is built
struct Chain {
    engine: Engine,
    media: MediaId,
    analysis: AnalysisTap,
    /// Node ids in signal order, sink last
    series: Vec<NodeId>,
}

enum Lifecycle {
    Uninitialized,
    Ready(Box<Chain>),
}

/// Owns the processing engine and every stage of the player's signal path.
///
/// Callers only reach the stages through the methods here; the equalizer and
/// isolation settings can be changed at any time, including before the graph
/// is built.
///
/// ```
/// use klangbild::{IsolationMode, MediaElement, OfflineHost, SignalGraph};
///
/// let mut graph = SignalGraph::new(OfflineHost::new(48000));
/// let mut media = MediaElement::new(vec![0.0; 48000], 1, 48000);
///
/// graph.set_mode(IsolationMode::Bass);
/// assert!(!graph.is_ready());
///
/// media.play();
/// graph.sync_playback(&mut media);
/// assert!(graph.is_ready());
///
/// graph.process();
/// assert_eq!(graph.analysis_snapshot().map(|s| s.len()), Some(128));
/// ```
pub struct SignalGraph<H: Host> {
    host: H,
    config: GraphConfig,
    mode_filter: ModeFilter,
    filter_bank: FilterBank,
    lifecycle: Lifecycle,
}

impl<H: Host> SignalGraph<H> {
    /// Create an unbuilt graph with default settings.
    pub fn new(host: H) -> Self {
        Self {
            host,
            config: GraphConfig::default(),
            mode_filter: ModeFilter::new(),
            filter_bank: FilterBank::new(),
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    /// Create an unbuilt graph, validating `config`.
    pub fn with_config(host: H, config: GraphConfig) -> Result<Self> {
        config.analyser.validate()?;
        Ok(Self {
            config,
            ..Self::new(host)
        })
    }

    #[inline]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Whether the engine and nodes exist.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Ready(_))
    }

    /// Build the signal path around `media`, once.
    ///
    /// Later calls return `Ok(())` without touching anything. On failure
    /// nothing is consumed and the call can be retried:
    /// - [`Error::EngineUnavailable`](crate::Error::EngineUnavailable) if the
    ///   host refuses an engine
    /// - [`Error::SourceAlreadyBound`](crate::Error::SourceAlreadyBound) if
    ///   `media` already feeds another graph
    pub fn ensure_constructed(&mut self, media: &mut MediaElement) -> Result<()> {
        if let Lifecycle::Ready(chain) = &self.lifecycle {
            if chain.media != media.id() {
                warn!(bound = %chain.media, offered = %media.id(), "graph already built for another element");
            }
            return Ok(());
        }

        if media.is_bound() {
            return Err(Error::SourceAlreadyBound);
        }
        let mut engine = self.host.create_engine()?;
        let mut source = media.take_source()?;

        let queue_size = self.config.queue_size;
        let channels = engine.channels();
        debug!(media = %media.id(), channels, "building signal graph");

        source.set_output_channels(channels);
        let source = engine.add_with_queue_size(source, queue_size);
        let isolator = self.mode_filter.attach(&mut engine, queue_size);
        let bands = self.filter_bank.attach(&mut engine, queue_size);

        let ring = (self.config.analyser.fft_size * 4).max(MIN_ANALYSER_RING);
        let (producer, consumer) = RingBuffer::new(ring);
        let tap = engine.add_with_queue_size(AnalyserTap::new(producer, channels), 1);

        let mut series = Vec::with_capacity(bands.len() + 4);
        series.push(source.id());
        series.push(isolator);
        series.extend(bands);
        series.push(tap.id());
        series.push(engine.sink());
        let connections = engine.connect_chain(&series);
        debug!(nodes = engine.node_count(), connections, "signal graph wired");

        media.attach(source);
        info!(media = %media.id(), state = ?engine.state(), "signal graph ready");

        self.lifecycle = Lifecycle::Ready(Box::new(Chain {
            engine,
            media: media.id(),
            analysis: AnalysisTap::new(consumer, self.config.analyser),
            series,
        }));
        Ok(())
    }

    /// Resume a suspended engine. Returns `true` if processing was restarted.
    pub fn resume(&mut self) -> bool {
        match &mut self.lifecycle {
            Lifecycle::Ready(chain) => chain.engine.resume(),
            Lifecycle::Uninitialized => false,
        }
    }

    /// React to the player's state: once `media` is playing, make sure the
    /// graph exists and is running.
    ///
    /// Construction failures are logged; the next call retries.
    pub fn sync_playback(&mut self, media: &mut MediaElement) {
        if !media.is_playing() {
            return;
        }
        if let Err(err) = self.ensure_constructed(media) {
            warn!(%err, "signal graph not built, will retry on next play");
            return;
        }
        self.resume();
    }

    /// See [`FilterBank::set_band_gain`].
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        self.filter_bank.set_band_gain(index, gain_db)
    }

    /// See [`FilterBank::reset_all`].
    pub fn reset_all(&mut self) {
        self.filter_bank.reset_all();
    }

    /// See [`ModeFilter::set_mode`].
    pub fn set_mode(&mut self, mode: IsolationMode) {
        self.mode_filter.set_mode(mode);
    }

    #[inline]
    pub fn filter_bank(&self) -> &FilterBank {
        &self.filter_bank
    }

    #[inline]
    pub fn mode_filter(&self) -> &ModeFilter {
        &self.mode_filter
    }

    /// Render one block. Does nothing before construction or while suspended.
    pub fn process(&mut self) {
        if let Lifecycle::Ready(chain) = &mut self.lifecycle {
            chain.engine.process();
            // Keep the analyser ring from filling between snapshots
            chain.analysis.pull();
        }
    }

    /// Current spectrum, `None` before construction.
    pub fn analysis_snapshot(&mut self) -> Option<&EnergySnapshot> {
        match &mut self.lifecycle {
            Lifecycle::Ready(chain) => Some(chain.analysis.snapshot()),
            Lifecycle::Uninitialized => None,
        }
    }

    /// Copy the current waveform as bytes. Returns `false` before construction.
    pub fn byte_time_domain_data(&mut self, out: &mut [u8]) -> bool {
        match &mut self.lifecycle {
            Lifecycle::Ready(chain) => {
                chain.analysis.byte_time_domain_data(out);
                true
            }
            Lifecycle::Uninitialized => false,
        }
    }

    pub fn engine(&self) -> Option<&Engine> {
        match &self.lifecycle {
            Lifecycle::Ready(chain) => Some(&chain.engine),
            Lifecycle::Uninitialized => None,
        }
    }

    /// Node ids in signal order (media first, output sink last).
    pub fn series(&self) -> Option<&[NodeId]> {
        match &self.lifecycle {
            Lifecycle::Ready(chain) => Some(&chain.series),
            Lifecycle::Uninitialized => None,
        }
    }

    /// Engine clock in seconds; 0 before construction.
    pub fn current_time(&self) -> f64 {
        self.engine().map_or(0.0, Engine::current_time)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::OfflineHost;

    #[test]
    fn nothing_is_built_up_front() {
        let mut graph = SignalGraph::new(OfflineHost::new(48000));
        assert!(!graph.is_ready());
        assert!(graph.engine().is_none());
        assert!(graph.analysis_snapshot().is_none());
        assert!(!graph.resume());
        assert_eq!(graph.current_time(), 0.0);
        graph.process();
        assert_eq!(graph.host().engines_created(), 0);
    }

    #[test]
    fn invalid_analyser_config_is_rejected() {
        let config = GraphConfig {
            analyser: AnalyserConfig { fft_size: 100, ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(
            SignalGraph::with_config(OfflineHost::new(48000), config),
            Err(Error::InvalidFftSize(100))
        ));
    }

    #[test]
    fn custom_resolution() {
        let config = GraphConfig {
            analyser: AnalyserConfig { fft_size: 2048, ..Default::default() },
            ..Default::default()
        };
        let mut graph = SignalGraph::with_config(OfflineHost::new(48000), config).unwrap();
        let mut media = MediaElement::new(vec![0.0; 4800], 2, 48000);
        graph.ensure_constructed(&mut media).unwrap();
        assert_eq!(graph.analysis_snapshot().map(|s| s.bins()), Some(1024));
    }

    #[test]
    fn element_bound_elsewhere() {
        let mut media = MediaElement::new(vec![0.0; 4800], 2, 48000);
        let mut first = SignalGraph::new(OfflineHost::new(48000));
        let mut second = SignalGraph::new(OfflineHost::new(48000));

        first.ensure_constructed(&mut media).unwrap();
        assert_eq!(second.ensure_constructed(&mut media), Err(Error::SourceAlreadyBound));
        // Refused before asking for an engine
        assert_eq!(second.host().engines_created(), 0);
    }
}
