//! Playable media owned by the player.
//!
//! A [`MediaElement`] is split in two: the element itself stays with whoever
//! drives transport (play, pause, seek), while its audio half, a
//! [`MediaSource`] node, is moved into exactly one
//! [`SignalGraph`](crate::SignalGraph) when that graph is constructed.
//! Transport commands issued before that point are applied to the source
//! directly; afterwards they travel through the node's message queue.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rtrb::{Consumer, RingBuffer};
use tracing::{debug, trace};

use crate::engine::Handle;
use crate::error::{Error, Result};
use crate::nodes::{MediaEvent, MediaSource, PlayerMessage};

/// Capacity of the event queue from the source node back to the element
const EVENT_QUEUE_SIZE: usize = 256;

static NEXT_MEDIA_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a [`MediaElement`], unique for the life of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MediaId(u64);

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media#{}", self.0)
    }
}

/// A decoded, playable audio stream.
///
/// ```
/// use klangbild::MediaElement;
///
/// // One second of stereo silence at 44.1 kHz
/// let mut element = MediaElement::new(vec![0.0; 88200], 2, 44100);
/// assert_eq!(element.duration(), 1.0);
///
/// element.play();
/// assert!(element.is_playing());
/// ```
pub struct MediaElement {
    id: MediaId,
    source: Option<MediaSource>,
    control: Option<Handle<PlayerMessage>>,
    events: Consumer<MediaEvent>,

    playing: bool,
    ended: bool,
    duration: f64,
    current_time: f64,
}

impl MediaElement {
    /// Create an element from interleaved samples.
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        let (producer, events) = RingBuffer::new(EVENT_QUEUE_SIZE);
        let source = MediaSource::new(samples, channels, sample_rate, producer);
        let id = MediaId(NEXT_MEDIA_ID.fetch_add(1, Ordering::Relaxed));

        debug!(%id, channels = source.channels(), sample_rate = source.sample_rate(), "media element created");

        Self {
            id,
            duration: source.duration_secs(),
            source: Some(source),
            control: None,
            events,
            playing: false,
            ended: false,
            current_time: 0.0,
        }
    }

    #[inline]
    pub fn id(&self) -> MediaId {
        self.id
    }

    /// Whether the audio half has been placed in a graph.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.source.is_none()
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[inline]
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Total duration in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Last reported playback position in seconds.
    #[inline]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Start or resume playback. An ended element starts over.
    pub fn play(&mut self) {
        if self.ended {
            self.current_time = 0.0;
        }
        self.playing = true;
        self.ended = false;
        self.command(PlayerMessage::Play);
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.command(PlayerMessage::Pause);
    }

    /// Pause and rewind to the start.
    pub fn stop(&mut self) {
        self.playing = false;
        self.current_time = 0.0;
        self.command(PlayerMessage::Stop);
    }

    /// Jump to `secs` (clamped to the media).
    pub fn seek(&mut self, secs: f64) {
        self.current_time = secs.clamp(0.0, self.duration);
        self.ended = false;
        self.command(PlayerMessage::Seek(secs));
    }

    /// Playback volume, 1.0 is unity gain.
    pub fn set_volume(&mut self, volume: f32) {
        self.command(PlayerMessage::SetVolume(volume));
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.command(PlayerMessage::SetLooping(looping));
    }

    /// Drain notifications from the audio side, updating the element's state
    /// as they are read.
    pub fn poll_events(&mut self) -> impl Iterator<Item = MediaEvent> + '_ {
        core::iter::from_fn(move || {
            let event = self.events.pop().ok()?;
            self.apply(event);
            Some(event)
        })
    }

    fn apply(&mut self, event: MediaEvent) {
        trace!(id = %self.id, ?event, "media event");
        match event {
            MediaEvent::LoadedMetadata { duration } => self.duration = duration,
            MediaEvent::TimeUpdate { position } => self.current_time = position,
            MediaEvent::Ended => {
                self.playing = false;
                self.ended = true;
            }
        }
    }

    fn command(&mut self, msg: PlayerMessage) {
        match (self.control.as_mut(), self.source.as_mut()) {
            (Some(control), _) => control.send_or_warn(msg, "transport"),
            (None, Some(source)) => source.handle(msg),
            // Taken but not yet attached: only reachable inside graph construction
            (None, None) => {}
        }
    }

    /// Move the audio half out, for placement into a graph.
    pub(crate) fn take_source(&mut self) -> Result<MediaSource> {
        self.source.take().ok_or(Error::SourceAlreadyBound)
    }

    /// Route further transport commands to the node behind `control`.
    pub(crate) fn attach(&mut self, control: Handle<PlayerMessage>) {
        self.control = Some(control);
    }
}

impl fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaElement")
            .field("id", &self.id)
            .field("bound", &self.is_bound())
            .field("playing", &self.playing)
            .field("ended", &self.ended)
            .field("duration", &self.duration)
            .field("current_time", &self.current_time)
            .finish()
    }
}
