//! Media element audio output.

use dasp_graph::{Buffer, Input};
use rtrb::Producer;

use crate::nodes::effect::silence;
use crate::node::{AudioNode, ProcessContext};

/// Media time between two [`MediaEvent::TimeUpdate`]s, in seconds
pub const TIME_UPDATE_INTERVAL: f64 = 0.25;

/// Transport commands for a [`MediaSource`].
///
/// Sent by [`MediaElement`](crate::MediaElement); you rarely need these directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlayerMessage {
    /// Start or resume playback.
    Play,
    /// Pause playback (keeps position).
    Pause,
    /// Stop playback and reset to the beginning.
    Stop,
    /// Set playback volume (0.0 to 2.0, where 1.0 is unity gain).
    SetVolume(f32),
    /// Seek to position in seconds.
    Seek(f64),
    /// Enable or disable looping.
    SetLooping(bool),
}

/// Notifications from a playing [`MediaSource`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaEvent {
    /// First block rendered; total duration is known.
    LoadedMetadata { duration: f64 },
    /// Playback position moved (periodic while playing, and after a seek).
    TimeUpdate { position: f64 },
    /// Reached the end without looping; playback has stopped.
    Ended,
}

/// Plays pre-decoded interleaved samples into the graph.
///
/// This is the audio half of a [`MediaElement`](crate::MediaElement). The
/// media keeps its own sample rate; frames are linearly interpolated to the
/// engine's rate.
pub struct MediaSource {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    out_channels: usize,

    /// Fractional frame position in the media
    position: f64,
    playing: bool,
    volume: f32,
    looping: bool,

    events: Producer<MediaEvent>,
    announced: bool,
    last_time_update: f64,
}

impl MediaSource {
    pub(crate) fn new(
        samples: Vec<f32>,
        channels: usize,
        sample_rate: u32,
        events: Producer<MediaEvent>,
    ) -> Self {
        let channels = channels.max(1);
        Self {
            samples,
            channels,
            sample_rate: sample_rate.max(1),
            out_channels: 2,
            position: 0.0,
            playing: false,
            volume: 1.0,
            looping: false,
            events,
            announced: false,
            last_time_update: 0.0,
        }
    }

    /// Number of channels the node writes (set when it is bound into an engine)
    pub(crate) fn set_output_channels(&mut self, channels: usize) {
        self.out_channels = channels.max(1);
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Get the total duration in seconds.
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Get the current playback position in seconds.
    #[inline]
    pub fn position_secs(&self) -> f64 {
        self.position / self.sample_rate as f64
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    fn emit(&mut self, event: MediaEvent) {
        // Nobody polling: the element only mirrors state, so losing events is harmless
        let _ = self.events.push(event);
    }

    fn time_update(&mut self) {
        let position = self.position_secs();
        self.last_time_update = position;
        self.emit(MediaEvent::TimeUpdate { position });
    }

    pub(crate) fn handle(&mut self, msg: PlayerMessage) {
        match msg {
            PlayerMessage::Play => {
                if self.position as usize >= self.frames() {
                    self.position = 0.0;
                }
                self.playing = true;
            }
            PlayerMessage::Pause => self.playing = false,
            PlayerMessage::Stop => {
                self.playing = false;
                self.position = 0.0;
                self.time_update();
            }
            PlayerMessage::SetVolume(v) => self.volume = v.clamp(0.0, 2.0),
            PlayerMessage::Seek(secs) => {
                let frame = (secs.max(0.0) * self.sample_rate as f64).min(self.frames() as f64);
                self.position = frame;
                self.time_update();
            }
            PlayerMessage::SetLooping(l) => self.looping = l,
        }
    }

    /// Interpolated sample of `channel` at the fractional frame `pos`
    #[inline]
    fn sample_at(&self, pos: f64, channel: usize) -> f32 {
        let frames = self.frames();
        let frame = pos as usize;
        let t = (pos - frame as f64) as f32;

        let a = self.samples[frame * self.channels + channel];
        let next = frame + 1;
        let b = if next < frames {
            self.samples[next * self.channels + channel]
        } else if self.looping {
            self.samples[channel]
        } else {
            a
        };
        a + t * (b - a)
    }
}

impl AudioNode for MediaSource {
    type Message = PlayerMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = PlayerMessage>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            self.handle(msg);
        }

        if !self.announced {
            self.announced = true;
            let duration = self.duration_secs();
            self.emit(MediaEvent::LoadedMetadata { duration });
        }

        // Fast path: not playing - output silence
        if !self.playing || outputs.is_empty() {
            silence(outputs);
            return;
        }

        let frames = self.frames() as f64;
        let step = self.sample_rate as f64 / ctx.sample_rate as f64;
        let buffer_len = outputs[0].len();

        for i in 0..buffer_len {
            if self.position >= frames {
                if self.looping && frames > 0.0 {
                    // A step can span the whole media more than once
                    self.position %= frames;
                } else {
                    // Fill remaining with silence
                    for buffer in outputs.iter_mut() {
                        buffer[i..].iter_mut().for_each(|s| *s = 0.0);
                    }
                    self.playing = false;
                    self.position = frames;
                    self.time_update();
                    self.emit(MediaEvent::Ended);
                    return;
                }
            }

            for (ch, buffer) in outputs.iter_mut().enumerate() {
                // Wrap if the engine has more channels than the media
                buffer[i] = self.sample_at(self.position, ch % self.channels) * self.volume;
            }

            self.position += step;
        }

        if self.position_secs() - self.last_time_update >= TIME_UPDATE_INTERVAL
            || self.position_secs() < self.last_time_update
        {
            self.time_update();
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 0 }

    #[inline]
    fn num_outputs(&self) -> usize {
        self.out_channels
    }
}
