mod media;

pub use media::{MediaEvent, MediaSource, PlayerMessage, TIME_UPDATE_INTERVAL};
