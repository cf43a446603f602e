//! Headless unit controller for murmur.
//!
//! Wires the engine, network layer and audio sink into one runnable
//! unit: an audio thread filling blocks, a receive thread feeding the
//! delta queue, and a ping thread announcing the unit to its peers.
//! Also provides offline rendering for tests and diagnostics.

mod config;
mod wav;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use mm_audio::{AudioOutput, CpalOutput};
use mm_engine::{DeltaQueue, Engine};
use mm_ir::{Sysclock, BLOCK_SIZE};
use mm_net::{MulticastSocket, NetError, Receiver};

pub use config::UnitConfig;
pub use mm_ir::Frame;
pub use wav::{frames_to_wav, write_wav};

/// Errors starting a unit. Audio failures inside the audio thread are
/// reported through `is_running` instead (the stream cannot cross
/// threads to be built eagerly here).
#[derive(Debug)]
pub enum UnitError {
    Net(NetError),
    Io(std::io::Error),
}

impl std::fmt::Display for UnitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitError::Net(e) => write!(f, "network: {}", e),
            UnitError::Io(e) => write!(f, "io: {}", e),
        }
    }
}

impl std::error::Error for UnitError {}

/// One instrument unit.
pub struct Unit {
    cfg: UnitConfig,
    queue: Arc<Mutex<DeltaQueue>>,
    clock: Sysclock,
    receiver: Arc<Mutex<Receiver>>,
    running: Arc<AtomicBool>,
    audio_alive: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Unit {
    pub fn new(cfg: UnitConfig) -> Self {
        Self {
            queue: Arc::new(Mutex::new(DeltaQueue::new())),
            clock: Sysclock::new(),
            receiver: Arc::new(Mutex::new(Receiver::new(cfg.receiver_config()))),
            running: Arc::new(AtomicBool::new(false)),
            audio_alive: Arc::new(AtomicBool::new(true)),
            threads: Vec::new(),
            cfg,
        }
    }

    /// Shared handle to the authoritative clock.
    pub fn clock(&self) -> Sysclock {
        self.clock.clone()
    }

    pub fn queue(&self) -> Arc<Mutex<DeltaQueue>> {
        self.queue.clone()
    }

    /// Current self-assigned rank among live peers.
    pub fn rank(&self) -> u32 {
        self.receiver.lock().unwrap().rank()
    }

    /// Join the multicast group and spawn the audio, receive and ping
    /// threads.
    pub fn start(&mut self) -> Result<(), UnitError> {
        let socket =
            MulticastSocket::open(self.cfg.group, self.cfg.port).map_err(UnitError::Net)?;
        let ping_socket = socket.try_clone().map_err(UnitError::Io)?;

        self.running.store(true, Ordering::Relaxed);
        self.audio_alive.store(true, Ordering::Relaxed);

        {
            let queue = self.queue.clone();
            let clock = self.clock.clone();
            let running = self.running.clone();
            let alive = self.audio_alive.clone();
            self.threads.push(std::thread::spawn(move || {
                audio_thread(queue, clock, running, alive);
            }));
        }

        {
            let queue = self.queue.clone();
            let clock = self.clock.clone();
            let receiver = self.receiver.clone();
            let running = self.running.clone();
            self.threads.push(std::thread::spawn(move || {
                let mut buf = [0u8; 1500];
                while running.load(Ordering::Relaxed) {
                    match socket.recv(&mut buf) {
                        Some(len) => {
                            let now = clock.now_ms();
                            receiver.lock().unwrap().handle_packet(&buf[..len], now, &queue);
                        }
                        None => std::thread::sleep(Duration::from_millis(1)),
                    }
                }
            }));
        }

        {
            let clock = self.clock.clone();
            let receiver = self.receiver.clone();
            let running = self.running.clone();
            let interval = self.cfg.ping_interval_ms;
            let battery = self.cfg.battery_mask;
            self.threads.push(std::thread::spawn(move || {
                let mut slept = 0u64;
                while running.load(Ordering::Relaxed) {
                    std::thread::sleep(Duration::from_millis(50));
                    slept += 50;
                    if slept >= interval {
                        slept = 0;
                        let line = receiver.lock().unwrap().build_ping(clock.now_ms(), battery);
                        ping_socket.send(line.as_bytes());
                    }
                }
            }));
        }

        tracing::info!(unit = self.cfg.unit_id, addr = self.cfg.addr, "unit started");
        Ok(())
    }

    /// Stop all threads and wait for them.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }

    /// True while the unit runs and its audio sink is healthy.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && self.audio_alive.load(Ordering::Relaxed)
    }
}

impl Drop for Unit {
    fn drop(&mut self) {
        self.stop();
    }
}

fn audio_thread(
    queue: Arc<Mutex<DeltaQueue>>,
    clock: Sysclock,
    running: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
) {
    let Ok((mut output, consumer)) = CpalOutput::new() else {
        alive.store(false, Ordering::Relaxed);
        return;
    };
    if output.build_stream(consumer).is_err() {
        alive.store(false, Ordering::Relaxed);
        return;
    }
    let _ = output.start();

    let mut engine = Engine::new(queue, clock);
    let mut block = [Frame::silence(); BLOCK_SIZE];
    while running.load(Ordering::Relaxed) {
        engine.render_block(&mut block);
        output.write_block(&block);
    }
    let _ = output.stop();
}

/// Render `blocks` blocks offline after feeding the given message lines
/// at time zero. No sockets, no audio device.
pub fn render_offline(cfg: &UnitConfig, lines: &[&str], blocks: usize) -> Vec<Frame> {
    let queue = Arc::new(Mutex::new(DeltaQueue::new()));
    let clock = Sysclock::new();
    let mut receiver = Receiver::new(cfg.receiver_config());
    for line in lines {
        receiver.handle_line(line, clock.now_ms(), &queue);
    }
    let mut engine = Engine::new(queue, clock);
    engine.render_blocks(blocks)
}

/// Offline render straight to WAV bytes.
pub fn render_offline_wav(cfg: &UnitConfig, lines: &[&str], blocks: usize) -> Vec<u8> {
    frames_to_wav(&render_offline(cfg, lines, blocks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_amplitude(frames: &[Frame]) -> i16 {
        frames.iter().map(|f| f.left.saturating_abs()).max().unwrap_or(0)
    }

    #[test]
    fn offline_render_plays_a_message() {
        let cfg = UnitConfig::default();
        let frames = render_offline(&cfg, &["v0w0f440l1"], 20);
        assert!(max_amplitude(&frames) > 100);
    }

    #[test]
    fn offline_render_respects_addressing() {
        let cfg = UnitConfig { unit_id: 5, ..UnitConfig::default() };
        let frames = render_offline(&cfg, &["c3v0w0f440l1"], 20);
        assert_eq!(max_amplitude(&frames), 0);
    }

    #[test]
    fn offline_wav_has_riff_header() {
        let cfg = UnitConfig::default();
        let wav = render_offline_wav(&cfg, &["v0f440l1"], 4);
        assert_eq!(&wav[0..4], b"RIFF");
    }

    #[test]
    fn stop_before_start_is_harmless() {
        let mut unit = Unit::new(UnitConfig::default());
        unit.stop();
        assert!(!unit.is_running());
    }
}
