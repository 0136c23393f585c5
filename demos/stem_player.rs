//! Play an audio file through the equalizer and isolation filter, cycling
//! through isolation modes.
//!
//! Run with: cargo run --example stem_player --features cpal_sink -- song.ogg
//!
//! Set `KLANGBILD_DEVICE` to part of a device name to pick a specific output.

use std::thread::sleep;
use std::time::{Duration, Instant};

use symphonium::SymphoniumLoader;

use klangbild::{CpalDevice, CpalHost, IsolationMode, MediaElement, SignalGraph, Tick, Visualizer, BLOCK_SIZE};

/// Seconds spent in each isolation mode
const MODE_SECS: f64 = 5.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let path = std::env::args().nth(1).ok_or("usage: stem_player <audio file>")?;
    let decoded = SymphoniumLoader::new().load_f32(&path, None)?;
    let mut media = MediaElement::new(decoded.as_interleaved(), decoded.channels(), decoded.sample_rate);

    let host = match std::env::var("KLANGBILD_DEVICE") {
        Ok(name) => CpalHost::with_device(CpalDevice::find_output(&name).ok_or("no matching output device")?),
        Err(_) => CpalHost::default_output(),
    };
    let mut graph = SignalGraph::new(host);
    let mut visualizer = Visualizer::new();

    media.play();
    graph.sync_playback(&mut media);
    let rate = graph.engine().ok_or("no audio device")?.sample_rate() as f64;

    println!("Playing {} ({:.1}s)... Ctrl+C to stop", path, media.duration());

    let start = Instant::now();
    let mut blocks = 0u64;
    let mut modes = IsolationMode::ALL.iter().cycle();
    let mut next_switch = 0.0;

    while !media.has_ended() {
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed >= next_switch {
            if let Some(&mode) = modes.next() {
                graph.set_mode(mode);
                println!("mode: {}", mode);
            }
            next_switch += MODE_SECS;
        }

        // Stay a few blocks ahead of the device
        let target = (elapsed * rate / BLOCK_SIZE as f64) as u64 + 6;
        while blocks < target {
            graph.process();
            blocks += 1;
        }

        media.poll_events().for_each(drop);
        if let Tick::Frame { flags, changed: true } = visualizer.tick(&mut graph, media.is_playing()) {
            println!("  {:?}", flags);
        }

        sleep(Duration::from_millis(16));
    }

    Ok(())
}
