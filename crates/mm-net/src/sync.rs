//! Decentralized clock-sync peer table and rank assignment.
//!
//! Every unit keeps `(remote_clock, local_receipt_time)` per peer address
//! byte. Rank is recomputed on every sync-bearing message as the number
//! of live peers ranking ahead; stale entries are pruned in the same
//! pass. No coordinator anywhere.

/// Valid address bytes are 0-254.
pub const PEER_SLOTS: usize = 255;

/// Last sighting of one peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Peer {
    /// Peer's sysclock (ms) as reported in its last sync message.
    pub remote_clock: u64,
    /// Local sysclock (ms) when that message arrived.
    pub received_at: u64,
    /// The rank the peer reported for itself, if any.
    pub rank: u32,
    /// Status/battery bitmask from the last ping.
    pub battery: u8,
}

impl Peer {
    /// Remote clock extrapolated to local `now`.
    fn predicted(&self, now_ms: u64) -> u64 {
        self.remote_clock + (now_ms - self.received_at)
    }
}

/// The sync table, indexed by address byte.
pub struct PeerTable {
    peers: Vec<Option<Peer>>,
    ping_interval_ms: u64,
}

impl PeerTable {
    pub fn new(ping_interval_ms: u64) -> Self {
        Self { peers: vec![None; PEER_SLOTS], ping_interval_ms }
    }

    /// Record a sync sighting of `addr`.
    pub fn update(&mut self, addr: u8, remote_clock: u64, rank: u32, battery: u8, now_ms: u64) {
        let slot = addr as usize;
        if slot >= PEER_SLOTS {
            return;
        }
        if self.peers[slot].is_none() {
            tracing::info!(addr, "peer appeared");
        }
        self.peers[slot] = Some(Peer { remote_clock, received_at: now_ms, rank, battery });
    }

    pub fn get(&self, addr: u8) -> Option<&Peer> {
        self.peers.get(addr as usize).and_then(|p| p.as_ref())
    }

    /// Drop a peer outright (tests, shutdown notifications).
    pub fn remove(&mut self, addr: u8) {
        if let Some(slot) = self.peers.get_mut(addr as usize) {
            *slot = None;
        }
    }

    /// A peer is alive while its last sighting is younger than twice the
    /// ping interval.
    pub fn is_alive(&self, addr: u8, now_ms: u64) -> bool {
        self.get(addr)
            .is_some_and(|p| now_ms < p.received_at + 2 * self.ping_interval_ms)
    }

    /// Count live peers, pruning nothing.
    pub fn alive_count(&self, now_ms: u64) -> usize {
        (0..PEER_SLOTS as u16)
            .filter(|&a| self.is_alive(a as u8, now_ms))
            .count()
    }

    /// Recompute the caller's ordinal rank among live peers, pruning
    /// stale entries in the same pass.
    ///
    /// A peer ranks ahead when its predicted clock exceeds local now;
    /// ties break toward the lower address byte. The full-table scan is
    /// fine at this scale.
    pub fn recompute_rank(&mut self, own_addr: u8, now_ms: u64) -> u32 {
        let mut rank = 0;
        for addr in 0..PEER_SLOTS {
            if addr == own_addr as usize {
                continue;
            }
            let Some(peer) = self.peers[addr] else { continue };
            if now_ms >= peer.received_at + 2 * self.ping_interval_ms {
                tracing::info!(addr, "peer pruned");
                self.peers[addr] = None;
                continue;
            }
            let predicted = peer.predicted(now_ms);
            if predicted > now_ms || (predicted == now_ms && (addr as u8) < own_addr) {
                rank += 1;
            }
        }
        rank
    }
}
