//! Ring buffer sink

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dasp_graph::{Buffer, Input};
use rtrb::Producer;

use crate::node::{AudioNode, ProcessContext};

/// Interleaves each block into an rtrb ring buffer.
///
/// Used by [`OfflineHost`](crate::OfflineHost) so rendered output can be
/// inspected or written elsewhere. A block that does not fit is skipped as a
/// whole and counted; the count stays readable through
/// [`drop_counter`](Self::drop_counter) after the sink moves into an engine.
pub struct RtrbSink {
    producer: Producer<f32>,
    channels: usize,
    dropped_blocks: Arc<AtomicU64>,
}

impl RtrbSink {
    pub fn new(producer: Producer<f32>, channels: usize) -> Self {
        Self {
            producer,
            channels: channels.max(1),
            dropped_blocks: Arc::default(),
        }
    }

    /// Shared count of blocks skipped because the reader fell behind
    pub fn drop_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped_blocks)
    }
}

impl AudioNode for RtrbSink {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Input],
        _outputs: &mut [Buffer],
    ) {
        let Some(buffers) = inputs.first().map(Input::buffers) else { return };
        let Some(frames) = buffers.first().map(|b| b.len()) else { return };

        if self.producer.slots() < frames * self.channels {
            self.dropped_blocks.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let last = buffers.len() - 1;
        for i in 0..frames {
            for ch in 0..self.channels {
                let _ = self.producer.push(buffers[ch.min(last)][i]);
            }
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}
