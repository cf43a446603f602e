//! Remote-to-local time translation.
//!
//! The first message ever received establishes the clock delta; after
//! that each message's play time is predicted from it. A prediction that
//! lands in the past or beyond the drift bound recomputes the delta from
//! the current message. Self-healing, never an error.

/// Translation state between one remote stream and the local sysclock.
#[derive(Clone, Debug)]
pub struct Timebase {
    /// `remote - local` at the reference message; None until the first.
    delta: Option<i64>,
    latency_ms: u64,
    drift_bound_ms: u64,
}

impl Timebase {
    pub fn new(latency_ms: u64, drift_bound_ms: u64) -> Self {
        Self { delta: None, latency_ms, drift_bound_ms }
    }

    /// Translate a remote schedule time into a local play time (ms).
    pub fn to_local(&mut self, remote_ms: u64, now_ms: u64) -> u64 {
        let delta = *self.delta.get_or_insert(remote_ms as i64 - now_ms as i64);
        let play = remote_ms as i64 - delta + self.latency_ms as i64;
        let bound = (now_ms + self.latency_ms + self.drift_bound_ms) as i64;

        if play < 0 || play > bound {
            tracing::debug!(play, bound, "clock drift, recomputing delta");
            self.delta = Some(remote_ms as i64 - now_ms as i64);
            return now_ms + self.latency_ms;
        }
        play as u64
    }

    /// Whether a reference delta has been established.
    pub fn is_established(&self) -> bool {
        self.delta.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LATENCY: u64 = 50;
    const DRIFT: u64 = 1000;

    #[test]
    fn first_message_lands_at_latency() {
        let mut tb = Timebase::new(LATENCY, DRIFT);
        assert!(!tb.is_established());
        let play = tb.to_local(1_000_000, 500);
        assert_eq!(play, 500 + LATENCY);
        assert!(tb.is_established());
    }

    #[test]
    fn subsequent_messages_track_the_delta() {
        let mut tb = Timebase::new(LATENCY, DRIFT);
        tb.to_local(1_000_000, 500);
        // 200 ms later in remote terms, 100 ms later locally: the
        // schedule offset carries through the fixed delta.
        let play = tb.to_local(1_000_200, 600);
        assert_eq!(play, 500 + 200 + LATENCY);
    }

    #[test]
    fn past_prediction_recomputes() {
        let mut tb = Timebase::new(LATENCY, DRIFT);
        tb.to_local(1_000_000, 500);
        // A remote time far in the past would predict play < 0.
        let play = tb.to_local(10, 700);
        assert_eq!(play, 700 + LATENCY);
        // The recomputed delta now anchors at that message.
        let next = tb.to_local(110, 800);
        assert_eq!(next, 700 + 100 + LATENCY);
    }

    #[test]
    fn far_future_prediction_recomputes() {
        let mut tb = Timebase::new(LATENCY, DRIFT);
        tb.to_local(1_000_000, 500);
        let play = tb.to_local(1_000_000 + DRIFT * 10, 600);
        assert_eq!(play, 600 + LATENCY);
    }

    #[test]
    fn prediction_inside_bound_is_kept() {
        let mut tb = Timebase::new(LATENCY, DRIFT);
        tb.to_local(1_000_000, 500);
        // within now + latency + drift
        let play = tb.to_local(1_000_000 + DRIFT - 100, 500);
        assert_eq!(play, 500 + (DRIFT - 100) + LATENCY);
    }
}
