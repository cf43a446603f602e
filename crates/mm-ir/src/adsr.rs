//! ADSR envelope scale evaluation.
//!
//! The scale is recomputed from wall-clock elapsed time every block rather
//! than integrated per sample, so a voice that missed blocks (or a unit
//! that joined late) still lands on the correct envelope position.

use libm::expf;

/// Attack/decay/sustain/release parameters. Times in milliseconds,
/// sustain as a 0-1 level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdsrParams {
    pub attack_ms: f32,
    pub decay_ms: f32,
    pub sustain: f32,
    pub release_ms: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self { attack_ms: 5.0, decay_ms: 120.0, sustain: 0.7, release_ms: 80.0 }
    }
}

/// Which segment the envelope is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdsrPhase {
    Idle,
    Attack,
    DecaySustain,
    Release,
    /// Release ran past `release_ms`; the voice should go `Off`.
    Finished,
}

/// Evaluate the envelope scale at `now_ms` given the gate clocks.
///
/// A non-zero `off_clock` takes precedence (release). Returns the scale
/// (clamped at 0) and the phase.
///
/// - attack (`elapsed <= A`):  `1 - exp(-3 elapsed / A)`
/// - decay/sustain:            `S + (1 - S) exp(-(elapsed - A) / (D/3))`
/// - release:                  `S exp(-3 elapsed / R)`, finished past R
pub fn adsr_scale(p: &AdsrParams, on_clock: u64, off_clock: u64, now_ms: u64) -> (f32, AdsrPhase) {
    if off_clock != 0 && now_ms >= off_clock {
        let elapsed = (now_ms - off_clock) as f32;
        if elapsed > p.release_ms || p.release_ms <= 0.0 {
            return (0.0, AdsrPhase::Finished);
        }
        let scale = p.sustain * expf(-3.0 * elapsed / p.release_ms);
        return (scale.max(0.0), AdsrPhase::Release);
    }

    if on_clock == 0 || now_ms < on_clock {
        return (0.0, AdsrPhase::Idle);
    }
    let elapsed = (now_ms - on_clock) as f32;

    if elapsed <= p.attack_ms && p.attack_ms > 0.0 {
        return ((1.0 - expf(-3.0 * elapsed / p.attack_ms)).max(0.0), AdsrPhase::Attack);
    }

    if p.decay_ms <= 0.0 {
        return (p.sustain.max(0.0), AdsrPhase::DecaySustain);
    }
    let t = elapsed - p.attack_ms.max(0.0);
    let scale = p.sustain + (1.0 - p.sustain) * expf(-t / (p.decay_ms / 3.0));
    (scale.max(0.0), AdsrPhase::DecaySustain)
}
