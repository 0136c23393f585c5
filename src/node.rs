//! Core node trait and context types.

use dasp_graph::{Buffer, Input};

/// Information available during audio processing.
///
/// Passed to every [`AudioNode::process`] call. Contains the engine's sample rate
/// and the block size (always 64 frames, the `dasp_graph` buffer length).
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Sample rate of the engine in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of frames per block
    pub buffer_size: usize,
}

impl ProcessContext {
    /// Duration of one block in seconds.
    #[inline]
    pub fn block_duration(&self) -> f64 {
        self.buffer_size as f64 / self.sample_rate as f64
    }
}

/// Unique identifier for a node within an engine.
///
/// You typically don't interact with this directly - use [`Handle`](crate::Handle) instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

/// The core trait for audio processing nodes.
///
/// Every stage of the player's signal path is an `AudioNode`:
/// - **Sources**: the media element output (0 inputs)
/// - **Effects**: the isolator, equalizer bands and analysis tap (1 input)
/// - **Sinks**: device or ring buffer outputs (0 outputs)
///
/// # Message-Based Parameters
///
/// Nodes never share mutable state with the control side. Parameter changes
/// arrive as messages and are drained at the start of each block:
///
/// ```
/// use klangbild::{AudioNode, ProcessContext};
/// use dasp_graph::{Buffer, Input};
///
/// enum TrimMessage {
///     SetLevel(f32),
/// }
///
/// struct Trim {
///     level: f32,
/// }
///
/// impl AudioNode for Trim {
///     type Message = TrimMessage;
///
///     fn process(
///         &mut self,
///         _ctx: &ProcessContext,
///         messages: impl Iterator<Item = TrimMessage>,
///         inputs: &[Input],
///         outputs: &mut [Buffer],
///     ) {
///         for msg in messages {
///             match msg {
///                 TrimMessage::SetLevel(l) => self.level = l,
///             }
///         }
///
///         let Some(input) = inputs.first() else { return };
///         for (out, inp) in outputs.iter_mut().zip(input.buffers()) {
///             for (o, i) in out.iter_mut().zip(inp.iter()) {
///                 *o = i * self.level;
///             }
///         }
///     }
///
///     fn num_inputs(&self) -> usize { 1 }
/// }
/// ```
pub trait AudioNode: Send + 'static {
    /// Message type for parameter updates.
    ///
    /// Use a custom enum for nodes with parameters, or `()` for nodes without.
    type Message: Send + 'static;

    /// Process one block of audio.
    ///
    /// 1. Drain and handle all pending messages
    /// 2. Read from `inputs` (if any)
    /// 3. Write to `outputs`
    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = Self::Message>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    );

    /// Number of audio input channels (0 for sources).
    fn num_inputs(&self) -> usize { 0 }

    /// Number of audio output channels.
    fn num_outputs(&self) -> usize { 1 }
}
