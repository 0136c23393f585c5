use dasp_signal::{self as signal, Signal};
use klangbild::{
    EngineState, Error, FilterShape, IsolationMode, InstrumentFlags, MediaElement, MediaEvent, OfflineHost,
    SignalGraph, Tick, Visualizer, BAND_COUNT,
};
use rtrb::Consumer;

const RATE: u32 = 48000;
/// Blocks per second at 48 kHz
const BLOCKS_PER_SEC: usize = 750;

fn sine(hz: f64, secs: f64, amplitude: f32) -> Vec<f32> {
    signal::rate(RATE as f64)
        .const_hz(hz)
        .sine()
        .take((RATE as f64 * secs) as usize)
        .map(|s| s as f32 * amplitude)
        .collect()
}

/// Build a graph around `media` (already playing) and return it with its output
fn playing_graph(media: &mut MediaElement) -> (SignalGraph<OfflineHost>, Consumer<f32>) {
    let mut graph = SignalGraph::new(OfflineHost::new(RATE));
    media.play();
    graph.sync_playback(media);
    assert!(graph.is_ready());
    let output = graph.host_mut().take_output().expect("engine created");
    (graph, output)
}

/// Render `blocks` blocks, returning the left channel
fn render(graph: &mut SignalGraph<OfflineHost>, output: &mut Consumer<f32>, blocks: usize) -> Vec<f32> {
    let mut left = Vec::with_capacity(blocks * 64);
    for _ in 0..blocks {
        graph.process();
        let mut i = 0;
        while let Ok(s) = output.pop() {
            if i % 2 == 0 {
                left.push(s);
            }
            i += 1;
        }
    }
    left
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[test]
fn construction_is_idempotent() {
    let mut media = MediaElement::new(vec![0.0; 4800], 2, RATE);
    let (mut graph, _output) = playing_graph(&mut media);

    let nodes = graph.engine().map(|e| e.node_count());
    let edges = graph.engine().map(|e| e.edge_count());
    // media, isolator, 6 bands, tap, sink
    assert_eq!(nodes, Some(10));
    assert_eq!(edges, Some(9));

    graph.ensure_constructed(&mut media).unwrap();
    graph.sync_playback(&mut media);
    graph.ensure_constructed(&mut media).unwrap();

    assert_eq!(graph.host().engines_created(), 1);
    assert_eq!(graph.engine().map(|e| e.node_count()), nodes);
    assert_eq!(graph.engine().map(|e| e.edge_count()), edges);
}

#[test]
fn chain_is_wired_in_series() {
    let mut media = MediaElement::new(vec![0.0; 4800], 2, RATE);
    let (graph, _output) = playing_graph(&mut media);

    let series = graph.series().unwrap();
    let engine = graph.engine().unwrap();
    assert_eq!(series.len(), 10);
    assert_eq!(series.last(), Some(&engine.sink()));
    for pair in series.windows(2) {
        assert!(engine.is_connected(pair[0], pair[1]));
    }
    // Strictly series: no shortcuts around a stage
    assert!(!engine.is_connected(series[0], series[2]));
}

#[test]
fn gains_pass_through_after_construction() {
    let mut media = MediaElement::new(vec![0.0; 4800], 2, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);

    let gains = [-40.0, -12.0, 0.5, 12.0, 24.0, 1e3];
    for (i, g) in gains.into_iter().enumerate() {
        graph.set_band_gain(i, g).unwrap();
    }
    render(&mut graph, &mut output, 4);
    assert_eq!(graph.filter_bank().gains(), gains);

    graph.reset_all();
    render(&mut graph, &mut output, 1);
    assert_eq!(graph.filter_bank().gains(), [0.0; BAND_COUNT]);
}

#[test]
fn extreme_gains_recover_after_reset() {
    let mut media = MediaElement::new(sine(1000.0, 1.0, 0.5), 1, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);

    graph.set_band_gain(5, 1e3).unwrap();
    graph.set_band_gain(2, f32::NAN).unwrap();
    let wild = render(&mut graph, &mut output, 10);
    assert!(wild.iter().all(|s| s.is_finite()));

    graph.reset_all();
    let left = render(&mut graph, &mut output, 200);
    assert!(left.iter().all(|s| s.is_finite()));
    let level = rms(&left[left.len() - 4800..]);
    assert!((level - 0.5 / 2f32.sqrt()).abs() < 0.02, "{}", level);
}

#[test]
fn tiny_looping_media_keeps_playing() {
    // One frame at twice the engine rate
    let mut media = MediaElement::new(vec![0.5], 1, RATE * 2);
    media.set_looping(true);
    let (mut graph, mut output) = playing_graph(&mut media);

    let left = render(&mut graph, &mut output, 20);
    assert_eq!(left.len(), 20 * 64);
    assert!(left.iter().all(|s| s.is_finite()));
    assert!(media.is_playing());
}

#[test]
fn out_of_range_band_is_rejected() {
    let mut graph = SignalGraph::new(OfflineHost::new(RATE));
    graph.set_band_gain(3, 4.0).unwrap();
    let before = graph.filter_bank().gains();

    assert_eq!(graph.set_band_gain(6, 0.0), Err(Error::IndexOutOfRange { index: 6, len: 6 }));
    assert_eq!(graph.filter_bank().gains(), before);
}

#[test]
fn every_mode_is_observable() {
    let mut media = MediaElement::new(vec![0.0; 4800], 2, RATE);
    let (mut graph, _output) = playing_graph(&mut media);

    let table = [
        (IsolationMode::Bass, FilterShape::LowPass, 200.0, 1.0),
        (IsolationMode::Drums, FilterShape::Notch, 500.0, 0.5),
        (IsolationMode::Vocals, FilterShape::BandPass, 1000.0, 0.8),
        (IsolationMode::Mids, FilterShape::BandPass, 2500.0, 1.0),
        (IsolationMode::Normal, FilterShape::AllPass, 350.0, 1.0),
    ];
    for (mode, shape, frequency, q) in table {
        graph.set_mode(mode);
        graph.process();
        let config = graph.mode_filter().config();
        assert_eq!(graph.mode_filter().mode(), mode);
        assert_eq!((config.shape, config.frequency, config.q), (shape, frequency, q));
    }
}

#[test]
fn gesture_gates_construction() {
    let mut graph = SignalGraph::new(OfflineHost::new(RATE).require_gesture());
    let mut media = MediaElement::new(vec![0.0; 4800], 2, RATE);

    assert_eq!(graph.ensure_constructed(&mut media), Err(Error::EngineUnavailable));
    // Nothing consumed, retry possible
    assert!(!media.is_bound());
    assert!(!graph.is_ready());

    // Paused playback never tries
    graph.host_mut().grant_gesture();
    graph.sync_playback(&mut media);
    assert!(!graph.is_ready());

    media.play();
    graph.sync_playback(&mut media);
    assert!(graph.is_ready());
    assert!(media.is_bound());
}

#[test]
fn suspended_engine_resumes_on_play() {
    let mut graph = SignalGraph::new(OfflineHost::new(RATE).start_suspended());
    let mut media = MediaElement::new(vec![0.0; 4800], 2, RATE);

    graph.ensure_constructed(&mut media).unwrap();
    assert_eq!(graph.engine().map(|e| e.state()), Some(EngineState::Suspended));
    graph.process();
    assert_eq!(graph.current_time(), 0.0);

    media.play();
    graph.sync_playback(&mut media);
    assert_eq!(graph.engine().map(|e| e.state()), Some(EngineState::Running));
    assert!(!graph.resume());

    graph.process();
    assert!(graph.current_time() > 0.0);
}

#[test]
fn normal_mode_passes_audio() {
    let mut media = MediaElement::new(sine(1000.0, 1.0, 0.5), 1, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);

    let left = render(&mut graph, &mut output, 200);
    let level = rms(&left[left.len() - 4800..]);
    assert!((level - 0.5 / 2f32.sqrt()).abs() < 0.02, "{}", level);
}

#[test]
fn bass_mode_removes_treble() {
    let mut media = MediaElement::new(sine(5000.0, 2.0, 0.5), 1, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);

    graph.set_mode(IsolationMode::Bass);
    // Long enough for the glide to settle
    let left = render(&mut graph, &mut output, BLOCKS_PER_SEC * 3 / 2);
    let level = rms(&left[left.len() - 4800..]);
    assert!(level < 0.02, "{}", level);
}

#[test]
fn mode_chosen_before_play_applies_at_construction() {
    let mut graph = SignalGraph::new(OfflineHost::new(RATE));
    graph.set_mode(IsolationMode::Bass);

    let mut media = MediaElement::new(sine(5000.0, 1.0, 0.5), 1, RATE);
    media.play();
    graph.sync_playback(&mut media);
    let mut output = graph.host_mut().take_output().unwrap();

    let left = render(&mut graph, &mut output, 100);
    let level = rms(&left[left.len() - 2400..]);
    assert!(level < 0.02, "{}", level);
}

#[test]
fn low_shelf_cut_attenuates_sub_bass() {
    let mut flat_media = MediaElement::new(sine(30.0, 2.0, 0.5), 1, RATE);
    let (mut flat, mut flat_out) = playing_graph(&mut flat_media);

    let mut cut_media = MediaElement::new(sine(30.0, 2.0, 0.5), 1, RATE);
    let (mut cut, mut cut_out) = playing_graph(&mut cut_media);
    cut.set_band_gain(0, -24.0).unwrap();

    let flat_left = render(&mut flat, &mut flat_out, BLOCKS_PER_SEC);
    let cut_left = render(&mut cut, &mut cut_out, BLOCKS_PER_SEC);

    let tail = 24000;
    let ratio = rms(&cut_left[cut_left.len() - tail..]) / rms(&flat_left[flat_left.len() - tail..]);
    assert!(ratio < 0.5, "{}", ratio);
}

#[test]
fn loud_bass_raises_bass_and_kick() {
    let mut media = MediaElement::new(sine(100.0, 2.0, 0.8), 1, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);
    let mut visualizer = Visualizer::new();

    let mut last = Tick::Idle;
    for _ in 0..BLOCKS_PER_SEC / 2 {
        render(&mut graph, &mut output, 1);
        last = visualizer.tick(&mut graph, media.is_playing());
    }

    let Tick::Frame { flags, .. } = last else {
        panic!("expected a frame, got {:?}", last);
    };
    assert!(flags.bass);
    assert!(flags.kick);
    assert!(!flags.high);
}

#[test]
fn flags_survive_pause() {
    let mut media = MediaElement::new(sine(100.0, 1.0, 0.8), 1, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);
    let mut visualizer = Visualizer::new();

    for _ in 0..100 {
        render(&mut graph, &mut output, 1);
        visualizer.tick(&mut graph, true);
    }
    let before = visualizer.flags();
    assert_ne!(before, InstrumentFlags::default());

    media.pause();
    assert_eq!(visualizer.tick(&mut graph, media.is_playing()), Tick::Idle);
    assert!(!visualizer.is_running());
    assert_eq!(visualizer.flags(), before);
}

#[test]
fn first_snapshot_after_a_long_gap_is_current() {
    // Half a second of 200 Hz, then half a second of 8 kHz
    let mut samples = sine(200.0, 0.5, 0.5);
    samples.extend(sine(8000.0, 0.5, 0.5));
    let mut media = MediaElement::new(samples, 1, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);

    // Far more audio than the analyser ring holds, with nobody reading
    render(&mut graph, &mut output, BLOCKS_PER_SEC * 9 / 10);

    let snapshot = graph.analysis_snapshot().unwrap();
    let peak = (0..snapshot.len()).max_by_key(|&i| snapshot[i]).unwrap();
    // 8 kHz at 187.5 Hz per bin
    assert!((40..=46).contains(&peak), "{}", peak);
    assert!(snapshot[1] < 100, "{}", snapshot[1]);
}

#[test]
fn media_reports_end() {
    // 0.1s of audio, 75 blocks
    let mut media = MediaElement::new(sine(440.0, 0.1, 0.5), 1, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);

    render(&mut graph, &mut output, 100);
    let events: Vec<_> = media.poll_events().collect();

    assert!(matches!(events.first(), Some(MediaEvent::LoadedMetadata { .. })));
    assert_eq!(events.last(), Some(&MediaEvent::Ended));
    assert!(media.has_ended());
    assert!(!media.is_playing());
    assert!((media.current_time() - 0.1).abs() < 1e-9);

    // Playing again starts over
    media.play();
    render(&mut graph, &mut output, 10);
    media.poll_events().for_each(drop);
    assert!(media.is_playing());
    assert!(media.current_time() < 0.1);
}

#[test]
fn seek_moves_playback() {
    let mut media = MediaElement::new(sine(440.0, 2.0, 0.5), 1, RATE);
    let (mut graph, mut output) = playing_graph(&mut media);

    media.seek(1.5);
    render(&mut graph, &mut output, 1);
    let positions: Vec<f64> = media
        .poll_events()
        .filter_map(|e| match e {
            MediaEvent::TimeUpdate { position } => Some(position),
            _ => None,
        })
        .collect();
    assert!(positions.contains(&1.5));
}

#[test]
fn undersized_snapshots_are_safe() {
    let short = vec![200u8; 40];
    let flags = InstrumentFlags::from_snapshot(&short);
    assert!(flags.high);
    assert!(flags.bass && !flags.kick && flags.vocal);
}
