//! Platform boundary: where engines come from.
//!
//! Hosts model the environment a player runs in. A host may refuse to hand
//! out an engine (no output device, or no user gesture yet under an autoplay
//! policy), and may hand out one that starts suspended.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, RingBuffer};
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::nodes::RtrbSink;

/// Provider of processing engines.
pub trait Host {
    /// Create an engine with its output sink attached.
    ///
    /// Fails with [`Error::EngineUnavailable`] when the platform does not
    /// permit it right now; callers retry later.
    fn create_engine(&mut self) -> Result<Engine>;
}

/// Default capacity of the offline output ring, in samples
pub const DEFAULT_OUTPUT_CAPACITY: usize = 1 << 16;

/// A host that renders into memory.
///
/// The engine's sink pushes interleaved samples into a ring buffer whose
/// reading half is available from [`take_output`](Self::take_output).
/// Optionally behaves like a browser: no engine until
/// [`grant_gesture`](Self::grant_gesture), and engines that start suspended.
///
/// ```
/// use klangbild::{Host, OfflineHost, Error};
///
/// let mut host = OfflineHost::new(48000).require_gesture();
/// assert_eq!(host.create_engine().err(), Some(Error::EngineUnavailable));
///
/// host.grant_gesture();
/// assert!(host.create_engine().is_ok());
/// ```
pub struct OfflineHost {
    sample_rate: u32,
    channels: usize,
    output_capacity: usize,
    gesture_required: bool,
    gesture_granted: bool,
    start_suspended: bool,
    engines_created: usize,
    output: Option<Consumer<f32>>,
    dropped_blocks: Option<Arc<AtomicU64>>,
}

impl OfflineHost {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 2,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            gesture_required: false,
            gesture_granted: false,
            start_suspended: false,
            engines_created: 0,
            output: None,
            dropped_blocks: None,
        }
    }

    /// Set the number of output channels (builder pattern). Default is stereo.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels.max(1);
        self
    }

    /// Set the output ring capacity in samples (builder pattern).
    pub fn with_output_capacity(mut self, samples: usize) -> Self {
        self.output_capacity = samples.max(1);
        self
    }

    /// Refuse engines until [`grant_gesture`](Self::grant_gesture) (builder pattern).
    pub fn require_gesture(mut self) -> Self {
        self.gesture_required = true;
        self
    }

    /// Hand out engines in the suspended state (builder pattern).
    pub fn start_suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }

    /// Record a user interaction, lifting the gesture requirement.
    pub fn grant_gesture(&mut self) {
        if !self.gesture_granted {
            debug!("user gesture granted");
        }
        self.gesture_granted = true;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// How many engines this host has handed out.
    pub fn engines_created(&self) -> usize {
        self.engines_created
    }

    /// Reading half of the most recent engine's output, once.
    pub fn take_output(&mut self) -> Option<Consumer<f32>> {
        self.output.take()
    }

    /// Blocks the most recent engine skipped because its output ring was full.
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped_blocks
            .as_ref()
            .map_or(0, |count| count.load(Ordering::Relaxed))
    }
}

impl Host for OfflineHost {
    fn create_engine(&mut self) -> Result<Engine> {
        if self.gesture_required && !self.gesture_granted {
            debug!("engine refused: waiting for a user gesture");
            return Err(Error::EngineUnavailable);
        }

        let (producer, consumer) = RingBuffer::new(self.output_capacity);
        let sink = RtrbSink::new(producer, self.channels);
        self.dropped_blocks = Some(sink.drop_counter());
        let mut engine = Engine::new(self.sample_rate, sink).with_channels(self.channels);
        if self.start_suspended {
            engine = engine.suspended();
        }

        self.output = Some(consumer);
        self.engines_created += 1;
        info!(
            sample_rate = self.sample_rate,
            channels = self.channels,
            state = ?engine.state(),
            "offline engine created"
        );
        Ok(engine)
    }
}

#[cfg(feature = "cpal_sink")]
pub use self::cpal_host::CpalHost;

#[cfg(feature = "cpal_sink")]
mod cpal_host {
    use tracing::{info, warn};

    use super::Host;
    use crate::device::CpalDevice;
    use crate::engine::Engine;
    use crate::error::{Error, Result};

    /// A host that plays through a system output device.
    pub struct CpalHost {
        device: Option<CpalDevice>,
    }

    impl CpalHost {
        /// Use the system's default output device, if there is one.
        pub fn default_output() -> Self {
            let device = CpalDevice::default_output();
            if device.is_none() {
                warn!("no default output device");
            }
            Self { device }
        }

        /// Use a specific device.
        pub fn with_device(device: CpalDevice) -> Self {
            Self { device: Some(device) }
        }

        pub fn device(&self) -> Option<&CpalDevice> {
            self.device.as_ref()
        }
    }

    impl Host for CpalHost {
        fn create_engine(&mut self) -> Result<Engine> {
            let device = self.device.as_ref().ok_or(Error::EngineUnavailable)?;
            let engine = Engine::new(device.sample_rate(), device.create_sink())
                .with_channels(device.channels() as usize);

            info!(
                device = device.name(),
                sample_rate = device.sample_rate(),
                channels = device.channels(),
                "output engine created"
            );
            Ok(engine)
        }
    }
}
