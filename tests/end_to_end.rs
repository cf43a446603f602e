//! Integration tests: wire bytes → parser → queue → engine → frames.

use std::sync::{Arc, Mutex};

use mm_engine::{DeltaQueue, Engine};
use mm_ir::{Frame, OscStatus, Sysclock, Waveform};
use mm_net::{Receiver, ReceiverConfig};
use mm_unit::{render_offline, UnitConfig};

fn rig() -> (Receiver, Arc<Mutex<DeltaQueue>>, Engine, Sysclock) {
    let queue = Arc::new(Mutex::new(DeltaQueue::new()));
    let clock = Sysclock::new();
    let receiver = Receiver::new(ReceiverConfig::default());
    let engine = Engine::new(queue.clone(), clock.clone());
    (receiver, queue, engine, clock)
}

fn max_amplitude(frames: &[Frame]) -> i16 {
    frames.iter().map(|f| f.left.saturating_abs()).max().unwrap_or(0)
}

#[test]
fn note_message_reaches_the_oscillator() {
    let (mut receiver, queue, mut engine, clock) = rig();

    // The canonical wire example: oscillator 0, sine, 440 Hz, trigger,
    // stamped with the sender's own clock.
    let t = clock.now_ms();
    receiver.handle_line(&format!("v0w0f440l1t{}", t), clock.now_ms(), &queue);

    // The first message anchors the timebase, so it plays at
    // now + latency (50 ms ≈ 9 blocks). Give it 20.
    let frames = engine.render_blocks(20);

    assert_eq!(engine.bank().oscs[0].status, OscStatus::Audible);
    assert_eq!(engine.bank().oscs[0].wave, Waveform::Sine);
    assert_eq!(engine.bank().oscs[0].freq, 440.0);
    assert!(max_amplitude(&frames) > 100);
}

#[test]
fn batched_packet_schedules_every_line() {
    let (mut receiver, queue, mut engine, clock) = rig();

    let packet = b"v0w0f440l1\nv1w2f220l1\nV8";
    receiver.handle_packet(packet, clock.now_ms(), &queue);
    engine.render_blocks(4);

    assert_eq!(engine.bank().oscs[0].status, OscStatus::Audible);
    assert_eq!(engine.bank().oscs[1].status, OscStatus::Audible);
    assert_eq!(engine.bank().oscs[1].wave, Waveform::Saw);
    assert_eq!(engine.bank().globals.master_volume, 8.0);
}

#[test]
fn untimed_release_message_fades_the_voice_out() {
    let (mut receiver, queue, mut engine, clock) = rig();

    receiver.handle_line("v0w0f440l1A1,50,0.8,40", clock.now_ms(), &queue);
    engine.render_blocks(4);
    assert_eq!(engine.bank().oscs[0].status, OscStatus::Audible);

    receiver.handle_line("v0l0", engine.clock().now_ms(), &queue);
    // release is 40 ms; render well past it
    engine.render_blocks(20);
    assert_eq!(engine.bank().oscs[0].status, OscStatus::Off);

    let tail = engine.render_blocks(4);
    assert_eq!(max_amplitude(&tail), 0);
}

#[test]
fn fm_patch_message_sounds_and_reset_silences() {
    let (mut receiver, queue, mut engine, clock) = rig();

    receiver.handle_line("v0p0f220l1", clock.now_ms(), &queue);
    let frames = engine.render_blocks(8);
    assert_eq!(engine.bank().oscs[0].wave, Waveform::Algorithm);
    assert_eq!(engine.bank().oscs[1].status, OscStatus::AlgoSource);
    assert!(max_amplitude(&frames) > 100);

    receiver.handle_line("S1", engine.clock().now_ms(), &queue);
    engine.render_blocks(2);
    let after = engine.render_blocks(4);
    assert_eq!(max_amplitude(&after), 0);
}

#[test]
fn clearing_algo_source_status_silences_the_chain() {
    let (mut receiver, queue, mut engine, clock) = rig();

    receiver.handle_line("v0p0f220l1", clock.now_ms(), &queue);
    let before = engine.render_blocks(8);
    assert!(max_amplitude(&before) > 100);

    // Reset every operator sub-oscillator; the voice keeps rendering but
    // its chain is gone.
    for osc in 1..=6 {
        receiver.handle_line(&format!("v{}S0", osc), engine.clock().now_ms(), &queue);
    }
    engine.render_blocks(2);
    let after = engine.render_blocks(4);
    assert_eq!(max_amplitude(&after), 0);
}

#[test]
fn output_is_always_within_sixteen_bits() {
    let (mut receiver, queue, mut engine, clock) = rig();

    // Everything loud at full master volume; the clipper has to hold.
    let now = clock.now_ms();
    receiver.handle_line("V10", now, &queue);
    for osc in 0..8 {
        receiver.handle_line(&format!("v{}w1f{}a1l1", osc, 100 + osc * 50), now, &queue);
    }
    let frames = engine.render_blocks(10);
    assert!(max_amplitude(&frames) > 20_000, "expected a loud mix");
    // i16 can't overflow by type, but saturation must land on max, not wrap
    assert!(frames.iter().all(|f| f.left > i16::MIN));
}

#[test]
fn eq_letters_land_in_globals() {
    let (mut receiver, queue, mut engine, clock) = rig();
    receiver.handle_line("x0.5y1.5z2.0", clock.now_ms(), &queue);
    engine.render_blocks(1);
    let globals = engine.bank().globals;
    assert_eq!(globals.eq_low, 0.5);
    assert_eq!(globals.eq_mid, 1.5);
    assert_eq!(globals.eq_high, 2.0);
}

#[test]
fn sync_traffic_never_schedules_audio() {
    let (mut receiver, queue, mut engine, clock) = rig();
    receiver.handle_line("_s123456i0c1r7y0Z", clock.now_ms(), &queue);
    assert_eq!(queue.lock().unwrap().len(), 0);
    let frames = engine.render_blocks(4);
    assert_eq!(max_amplitude(&frames), 0);
}

#[test]
fn offline_unit_render_matches_engine_path() {
    let cfg = UnitConfig::default();
    let frames = render_offline(&cfg, &["v0w3f330l1"], 12);
    assert!(max_amplitude(&frames) > 100);
}
