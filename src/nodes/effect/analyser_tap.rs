//! Pass-through node that feeds an analyser

use dasp_graph::{Buffer, Input};
use rtrb::Producer;

use super::filter::silence;
use crate::node::{AudioNode, ProcessContext};

/// Copies its input to its output unchanged and pushes a mono down-mix of
/// every block into a ring buffer for the control-side
/// [`AnalysisTap`](crate::AnalysisTap).
///
/// If the reader falls behind, whole blocks are skipped rather than
/// partially written.
pub struct AnalyserTap {
    producer: Producer<f32>,
    channels: usize,
}

impl AnalyserTap {
    pub fn new(producer: Producer<f32>, channels: usize) -> Self {
        Self {
            producer,
            channels: channels.max(1),
        }
    }
}

impl AudioNode for AnalyserTap {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        let Some(input) = inputs.first() else {
            silence(outputs);
            return;
        };
        let in_buffers = input.buffers();
        if in_buffers.is_empty() {
            silence(outputs);
            return;
        }

        for (ch, out_buffer) in outputs.iter_mut().enumerate() {
            out_buffer.copy_from_slice(&in_buffers[ch.min(in_buffers.len() - 1)]);
        }

        let len = in_buffers[0].len();
        if self.producer.slots() < len {
            return;
        }
        let scale = 1.0 / in_buffers.len() as f32;
        for i in 0..len {
            let mono: f32 = in_buffers.iter().map(|b| b[i]).sum::<f32>() * scale;
            let _ = self.producer.push(mono);
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { self.channels }
}
