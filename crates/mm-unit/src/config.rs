//! Unit configuration.

use std::net::Ipv4Addr;

use mm_net::ReceiverConfig;

/// Everything a unit needs to join the instrument.
#[derive(Clone, Copy, Debug)]
pub struct UnitConfig {
    /// Client id matched against the `c` field.
    pub unit_id: u32,
    /// Compact address byte (0-254) used in the sync table.
    pub addr: u8,
    /// Multicast group the instrument broadcasts on.
    pub group: Ipv4Addr,
    pub port: u16,
    /// Scheduling headroom added to translated play times.
    pub latency_ms: u64,
    /// Tolerated clock prediction error before re-anchoring.
    pub drift_bound_ms: u64,
    pub ping_interval_ms: u64,
    /// Status/battery bitmask carried in pings.
    pub battery_mask: u8,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            unit_id: 0,
            addr: 0,
            group: Ipv4Addr::new(239, 255, 77, 77),
            port: 7771,
            latency_ms: 50,
            drift_bound_ms: 1000,
            ping_interval_ms: 3000,
            battery_mask: 0,
        }
    }
}

impl UnitConfig {
    pub fn receiver_config(&self) -> ReceiverConfig {
        ReceiverConfig {
            unit_id: self.unit_id,
            addr: self.addr,
            latency_ms: self.latency_ms,
            drift_bound_ms: self.drift_bound_ms,
            ping_interval_ms: self.ping_interval_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_broadcastable() {
        let cfg = UnitConfig::default();
        assert!(cfg.group.is_multicast());
        assert_eq!(cfg.receiver_config().latency_ms, cfg.latency_ms);
    }
}
