//! Message routing: parse, address-filter, time-translate, enqueue.
//!
//! One `Receiver` per unit holds the timebase, the peer table and the
//! unit's current rank. Sync handling happens for every sync-bearing
//! line, whether or not the line also carries events.

use std::fmt::Write;
use std::sync::Mutex;

use mm_engine::DeltaQueue;

use crate::parser::parse_line;
use crate::sync::PeerTable;
use crate::timebase::Timebase;

/// Client ids at or above this value address a modulo group.
pub const GROUP_BASE: i32 = 100;

/// Number of modulo groups the unit population divides into.
pub const GROUP_COUNT: u32 = 4;

/// Identity and protocol timing for one unit.
#[derive(Clone, Copy, Debug)]
pub struct ReceiverConfig {
    /// This unit's client id (matched against `c`).
    pub unit_id: u32,
    /// This unit's compact address byte (0-254, sent as `r`).
    pub addr: u8,
    /// Scheduling headroom added to every translated play time.
    pub latency_ms: u64,
    /// Tolerated prediction error before the clock delta recomputes.
    pub drift_bound_ms: u64,
    pub ping_interval_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            unit_id: 0,
            addr: 0,
            latency_ms: 50,
            drift_bound_ms: 1000,
            ping_interval_ms: 3000,
        }
    }
}

/// The network-facing half of a unit.
pub struct Receiver {
    cfg: ReceiverConfig,
    timebase: Timebase,
    peers: PeerTable,
    rank: u32,
}

impl Receiver {
    pub fn new(cfg: ReceiverConfig) -> Self {
        Self {
            timebase: Timebase::new(cfg.latency_ms, cfg.drift_bound_ms),
            peers: PeerTable::new(cfg.ping_interval_ms),
            rank: 0,
            cfg,
        }
    }

    /// The unit's current self-assigned rank among live peers.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Handle one UDP payload: newline-separated batched messages.
    pub fn handle_packet(&mut self, payload: &[u8], now_ms: u64, queue: &Mutex<DeltaQueue>) {
        let Ok(text) = std::str::from_utf8(payload) else {
            tracing::debug!("dropping non-ascii packet");
            return;
        };
        for line in text.lines() {
            self.handle_line(line, now_ms, queue);
        }
    }

    /// Handle one message line.
    pub fn handle_line(&mut self, line: &str, now_ms: u64, queue: &Mutex<DeltaQueue>) {
        let Some(parsed) = parse_line(line) else { return };
        let event = &parsed.event;

        if event.is_sync_bearing() {
            self.peers.update(
                event.sender as u8,
                event.sync_time as u64,
                event.sync_index.max(0) as u32,
                event.battery.max(0) as u8,
                now_ms,
            );
            self.rank = self.peers.recompute_rank(self.cfg.addr, now_ms);
        }
        if parsed.sync_response {
            return;
        }
        if !self.addressed(event.client) {
            return;
        }

        let play = if event.time >= 0 {
            self.timebase.to_local(event.time as u64, now_ms)
        } else {
            now_ms
        };

        let mut queue = queue.lock().unwrap();
        for delta in parsed.event.deltas(play) {
            queue.enqueue(delta);
        }
        tracing::trace!(play, live = queue.len(), "message scheduled");
    }

    /// Addressing: broadcast when `c` is absent, exact unit id below
    /// `GROUP_BASE`, modulo group at or above it.
    fn addressed(&self, client: i32) -> bool {
        if client < 0 {
            return true;
        }
        if client < GROUP_BASE {
            return client as u32 == self.cfg.unit_id;
        }
        let group = (client - GROUP_BASE) as u32 % GROUP_COUNT;
        self.cfg.unit_id % GROUP_COUNT == group
    }

    /// Build the periodic ping line carrying local clock, rank, identity
    /// and the status/battery bitmask.
    pub fn build_ping(&self, now_ms: u64, battery: u8) -> String {
        let mut line = String::with_capacity(48);
        let _ = write!(
            line,
            "_s{}i{}c{}r{}y{}Z",
            now_ms, self.rank, self.cfg.unit_id, self.cfg.addr, battery
        );
        line
    }
}
