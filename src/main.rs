//! murmur: one unit of the distributed multicast instrument.
//!
//! Usage:
//!   murmur [--id N] [--addr N] [--group A.B.C.D] [--port N] [--seconds N]
//!   murmur --wav out.wav [--line MSG]... [--seconds N]
//!
//! Without `--wav` the unit joins the multicast group and renders to the
//! default audio device until `--seconds` elapses (or forever). With
//! `--wav` it renders the given message lines offline and writes a WAV.

use std::net::Ipv4Addr;
use std::time::Duration;

use mm_unit::{render_offline_wav, Unit, UnitConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return;
    }

    let mut cfg = UnitConfig::default();
    if let Some(v) = flag_value(&args, "--id") {
        cfg.unit_id = v.parse().unwrap_or_else(|_| bad_flag("--id", &v));
    }
    if let Some(v) = flag_value(&args, "--addr") {
        cfg.addr = v.parse().unwrap_or_else(|_| bad_flag("--addr", &v));
    }
    if let Some(v) = flag_value(&args, "--group") {
        cfg.group = v.parse::<Ipv4Addr>().unwrap_or_else(|_| bad_flag("--group", &v));
    }
    if let Some(v) = flag_value(&args, "--port") {
        cfg.port = v.parse().unwrap_or_else(|_| bad_flag("--port", &v));
    }
    let seconds: Option<u64> = flag_value(&args, "--seconds").map(|v| {
        v.parse().unwrap_or_else(|_| bad_flag("--seconds", &v))
    });

    match flag_value(&args, "--wav") {
        Some(path) => render_wav(&cfg, &args, &path, seconds.unwrap_or(5)),
        None => run_unit(cfg, seconds),
    }
}

fn run_unit(cfg: UnitConfig, seconds: Option<u64>) {
    let mut unit = Unit::new(cfg);
    if let Err(e) = unit.start() {
        eprintln!("failed to start unit: {}", e);
        std::process::exit(1);
    }
    println!(
        "unit {} (addr {}) on {}:{}",
        cfg.unit_id, cfg.addr, cfg.group, cfg.port
    );

    let mut elapsed = 0u64;
    while unit.is_running() {
        std::thread::sleep(Duration::from_millis(250));
        elapsed += 250;
        if let Some(s) = seconds {
            if elapsed >= s * 1000 {
                break;
            }
        }
    }
    if !unit.is_running() {
        eprintln!("audio sink failed, shutting down");
        std::process::exit(1);
    }
    unit.stop();
}

fn render_wav(cfg: &UnitConfig, args: &[String], path: &str, seconds: u64) {
    let lines: Vec<&str> = args
        .windows(2)
        .filter(|w| w[0] == "--line")
        .map(|w| w[1].as_str())
        .collect();
    if lines.is_empty() {
        eprintln!("--wav needs at least one --line message");
        std::process::exit(1);
    }

    // ~172 blocks per second at 44.1 kHz / 256-sample blocks
    let blocks = (seconds * mm_ir::SAMPLE_RATE as u64 / mm_ir::BLOCK_SIZE as u64) as usize;
    let wav = render_offline_wav(cfg, &lines, blocks);
    if let Err(e) = std::fs::write(path, &wav) {
        eprintln!("failed to write {}: {}", path, e);
        std::process::exit(1);
    }
    println!("wrote {} ({} bytes)", path, wav.len());
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn bad_flag(flag: &str, value: &str) -> ! {
    eprintln!("bad value for {}: {}", flag, value);
    std::process::exit(1);
}

fn usage() {
    println!("murmur: distributed multicast synthesizer unit");
    println!();
    println!("  murmur [--id N] [--addr N] [--group A.B.C.D] [--port N] [--seconds N]");
    println!("  murmur --wav out.wav [--line MSG]... [--seconds N]");
}
