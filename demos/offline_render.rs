//! Render a synthetic mix through every isolation mode and print what the
//! detector sees.
//!
//! Run with: cargo run --example offline_render

use dasp_signal::{self as signal, Signal};

use klangbild::{IsolationMode, MediaElement, OfflineHost, SignalGraph, Tick, Visualizer};

const RATE: u32 = 48000;
/// ~60 fps worth of blocks
const BLOCKS_PER_FRAME: usize = 12;

/// Bass at 80 Hz, a voice-range tone at 900 Hz and a bright 7 kHz tone
fn test_mix(secs: f64) -> Vec<f32> {
    let n = (RATE as f64 * secs) as usize;
    let tone = |hz: f64, amp: f64| signal::rate(RATE as f64).const_hz(hz).sine().scale_amp(amp);
    tone(80.0, 0.4)
        .add_amp(tone(900.0, 0.2))
        .add_amp(tone(7000.0, 0.1))
        .take(n)
        .map(|s| s as f32)
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut media = MediaElement::new(test_mix(10.0), 1, RATE);
    media.set_looping(true);

    let mut graph = SignalGraph::new(OfflineHost::new(RATE).require_gesture().start_suspended());
    let mut visualizer = Visualizer::new();

    // Nothing happens until the "user" presses play
    graph.host_mut().grant_gesture();
    media.play();
    graph.sync_playback(&mut media);
    let mut output = graph.host_mut().take_output().ok_or("no engine was created")?;

    graph.set_band_gain(0, 3.0)?;
    graph.set_band_gain(5, -6.0)?;

    for mode in IsolationMode::ALL {
        graph.set_mode(mode);

        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut last = Tick::Idle;

        // One second per mode, one detector tick per display frame
        for _ in 0..60 {
            for _ in 0..BLOCKS_PER_FRAME {
                graph.process();
            }
            while let Ok(sample) = output.pop() {
                sum += (sample as f64).powi(2);
                count += 1;
            }
            last = visualizer.tick(&mut graph, media.is_playing());
        }

        let rms = (sum / count.max(1) as f64).sqrt();
        println!("{:>7}: rms {:.4}  {:?}", mode, rms, last);
    }

    graph.reset_all();
    println!("eq after reset: {:?}", graph.filter_bank().gains());
    println!("rendered {:.2}s", graph.current_time());
    Ok(())
}
