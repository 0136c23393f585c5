//! CPAL audio output sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, SupportedStreamConfig};
use dasp_graph::{Buffer, Input};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, error, warn};

use crate::node::{AudioNode, ProcessContext};

/// A sink that outputs audio to a CPAL device
///
/// The CPAL stream runs on its own thread; this node feeds samples
/// into a ring buffer that the stream consumes.
pub struct CpalSink {
    buffer: Producer<f32>,
    channels: usize,
    /// Set by the stream when it ran dry, cleared and logged on the next block
    had_underrun: Arc<AtomicBool>,
}

impl CpalSink {
    /// Create a new sink for the given device and config
    pub fn new(device: &cpal::Device, config: &SupportedStreamConfig) -> Self {
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();
        let stream_config = config.config();
        let sample_rate = stream_config.sample_rate.0;

        // ~100ms of audio to ride out scheduling jitter
        let buffer_samples = ((sample_rate as f32 * 0.1) as usize) * channels;
        let buffer_size = buffer_samples.next_power_of_two().max(8192);
        let (producer, consumer) = RingBuffer::<f32>::new(buffer_size);

        let had_underrun = Arc::new(AtomicBool::new(false));

        let device = device.clone();
        let underrun = had_underrun.clone();
        std::thread::spawn(move || {
            let stream = match sample_format {
                SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, consumer, underrun),
                SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, consumer, underrun),
                SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, consumer, underrun),
                other => {
                    error!(format = ?other, "unsupported output sample format");
                    return;
                }
            };

            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    error!(%err, "failed to build output stream");
                    return;
                }
            };

            if let Err(err) = stream.play() {
                error!(%err, "failed to start output stream");
                return;
            }

            // The stream lives as long as this thread
            loop {
                std::thread::park();
            }
        });

        Self {
            buffer: producer,
            channels,
            had_underrun,
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut consumer: Consumer<f32>,
    had_underrun: Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    device.build_output_stream(
        stream_config,
        move |data: &mut [T], _| {
            let mut underrun = false;
            for sample in data.iter_mut() {
                let s = consumer.pop().unwrap_or_else(|_| {
                    underrun = true;
                    0.0
                });
                *sample = <T as Sample>::from_sample(s.clamp(-1.0, 1.0));
            }
            if underrun {
                had_underrun.store(true, Ordering::Relaxed);
            }
        },
        |err| warn!(%err, "output stream error"),
        None,
    )
}

impl AudioNode for CpalSink {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Input],
        _outputs: &mut [Buffer],
    ) {
        if self.had_underrun.swap(false, Ordering::Relaxed) {
            debug!("output device ran dry");
        }

        let Some(input) = inputs.first() else { return };
        let buffers = input.buffers();
        if buffers.is_empty() {
            return;
        }

        let buffer_len = buffers[0].len();
        let samples_needed = buffer_len * self.channels;

        // Generating faster than the device consumes: skip the block
        if self.buffer.slots() < samples_needed {
            return;
        }

        for i in 0..buffer_len {
            for ch in 0..self.channels {
                // Duplicate mono to every device channel if needed
                let src_ch = ch.min(buffers.len() - 1);
                let _ = self.buffer.push(buffers[src_ch][i]);
            }
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}
