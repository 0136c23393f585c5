//! Processing engine - runs the node graph against an output sink

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::graph::{AudioGraph, BLOCK_SIZE};
use crate::node::{AudioNode, NodeId};

/// Default capacity of each node's message queue
pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// A handle for sending messages to a node in the engine.
///
/// Handles are returned when you add a node to an [`Engine`] and provide two capabilities:
/// 1. **Connections** - Pass handles to [`Engine::connect`] or [`Engine::output`]
/// 2. **Messages** - Send parameter updates via [`Handle::send`]
///
/// Messages are buffered in a lock-free ring buffer and processed at the start
/// of each audio block. If the buffer is full, [`Handle::send`] returns `Err(msg)`
/// with the message that couldn't be sent.
pub struct Handle<M: Send + 'static> {
    pub(crate) node_id: NodeId,
    pub(crate) sender: rtrb::Producer<M>,
}

impl<M: Send + 'static> Handle<M> {
    /// Send a message to the node.
    ///
    /// - `Ok(())` if the message was queued
    /// - `Err(msg)` if the queue is full (message dropped)
    pub fn send(&mut self, msg: M) -> Result<(), M> {
        self.sender.push(msg).map_err(|rtrb::PushError::Full(m)| m)
    }

    /// Send a message, logging instead of failing when the queue is full.
    pub(crate) fn send_or_warn(&mut self, msg: M, what: &'static str) {
        if self.send(msg).is_err() {
            warn!(node = ?self.node_id, "{} message dropped: queue full", what);
        }
    }

    /// The id of the node this handle talks to.
    pub fn id(&self) -> NodeId {
        self.node_id
    }
}

/// Run state of an [`Engine`].
///
/// Platforms may hand out an engine that stays suspended until the user
/// interacts with the page or window; a suspended engine renders nothing and
/// its clock does not advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Suspended,
}

/// The audio processing engine - owns the node graph and its output sink.
///
/// Created by a [`Host`](crate::Host); the output sink is fixed for the
/// lifetime of the engine.
///
/// ```
/// use klangbild::Engine;
/// use klangbild::nodes::RtrbSink;
///
/// let (producer, _consumer) = rtrb::RingBuffer::new(4096);
/// let mut engine = Engine::new(48000, RtrbSink::new(producer, 2)).suspended();
///
/// engine.process();
/// assert_eq!(engine.blocks_processed(), 0);
///
/// engine.resume();
/// engine.process();
/// assert_eq!(engine.blocks_processed(), 1);
/// ```
pub struct Engine {
    graph: AudioGraph,
    sample_rate: u32,
    channels: usize,
    state: EngineState,
    sink_node: NodeId,
    blocks_processed: u64,
}

impl Engine {
    /// Create an engine at `sample_rate` rendering into `sink`.
    pub fn new<S: AudioNode<Message = ()>>(sample_rate: u32, sink: S) -> Self {
        let mut graph = AudioGraph::new(sample_rate);
        let sink = graph.add(sink, 1);
        graph.set_terminal(sink.id);

        debug!(sample_rate, "engine created");

        Self {
            graph,
            sample_rate,
            channels: 2,
            state: EngineState::Running,
            sink_node: sink.id,
            blocks_processed: 0,
        }
    }

    /// Set the number of channels nodes should produce (builder pattern).
    ///
    /// Default is 2 (stereo).
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels.max(1);
        self
    }

    /// Start in the suspended state (builder pattern).
    pub fn suspended(mut self) -> Self {
        self.state = EngineState::Suspended;
        self
    }

    /// Get the output sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels carried through the graph.
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Resume a suspended engine. Returns `true` if the state changed.
    pub fn resume(&mut self) -> bool {
        match self.state {
            EngineState::Suspended => {
                self.state = EngineState::Running;
                info!(time = self.current_time(), "engine resumed");
                true
            }
            EngineState::Running => false,
        }
    }

    /// Suspend processing. Returns `true` if the state changed.
    pub fn suspend(&mut self) -> bool {
        match self.state {
            EngineState::Running => {
                self.state = EngineState::Suspended;
                debug!(time = self.current_time(), "engine suspended");
                true
            }
            EngineState::Suspended => false,
        }
    }

    /// Engine clock in seconds; frozen while suspended.
    pub fn current_time(&self) -> f64 {
        (self.blocks_processed * BLOCK_SIZE as u64) as f64 / self.sample_rate as f64
    }

    /// Number of blocks rendered so far.
    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed
    }

    /// Add a node with the default queue size.
    pub fn add<N: AudioNode>(&mut self, node: N) -> Handle<N::Message> {
        self.add_with_queue_size(node, DEFAULT_QUEUE_SIZE)
    }

    /// Add a node with a custom message queue capacity.
    pub fn add_with_queue_size<N: AudioNode>(&mut self, node: N, queue_size: usize) -> Handle<N::Message> {
        let handle = self.graph.add(node, queue_size);
        Handle {
            node_id: handle.id,
            sender: handle.sender,
        }
    }

    /// Connect two nodes. Audio flows from `from` to `to`.
    ///
    /// Returns `false` when the connection already exists.
    pub fn connect<M1, M2>(&mut self, from: &Handle<M1>, to: &Handle<M2>) -> bool
    where
        M1: Send + 'static,
        M2: Send + 'static,
    {
        self.graph.connect(from.node_id, to.node_id)
    }

    /// Connect nodes in series, in the given order.
    ///
    /// Returns the number of new connections made.
    pub fn connect_chain(&mut self, nodes: &[NodeId]) -> usize {
        nodes
            .iter()
            .tuple_windows()
            .filter(|(a, b)| self.graph.connect(**a, **b))
            .count()
    }

    /// Connect a node to the output sink.
    pub fn output<M: Send + 'static>(&mut self, handle: &Handle<M>) -> bool {
        self.graph.connect(handle.node_id, self.sink_node)
    }

    /// Id of the output sink node.
    pub fn sink(&self) -> NodeId {
        self.sink_node
    }

    /// Whether `from` feeds directly into `to`.
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.graph.is_connected(from, to)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Process one block of audio (64 frames).
    ///
    /// Does nothing while suspended.
    pub fn process(&mut self) {
        if self.state == EngineState::Suspended {
            return;
        }
        self.graph.process();
        self.blocks_processed += 1;
    }
}
