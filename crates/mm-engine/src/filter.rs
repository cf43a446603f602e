//! Per-voice state-variable filter and the master three-band EQ.

use core::f32::consts::{PI, TAU};

use mm_ir::{Block, FilterKind, SAMPLE_RATE};

/// Chamberlin state-variable filter, one per oscillator.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterState {
    low: f32,
    band: f32,
}

impl FilterState {
    /// Filter a block in place. `resonance` 0-1 narrows the damping.
    pub fn process(&mut self, kind: FilterKind, cutoff_hz: f32, resonance: f32, block: &mut Block) {
        if kind == FilterKind::None {
            return;
        }
        // Tuning coefficient; clamp keeps the integrator stable.
        let f = (2.0 * (PI * cutoff_hz / SAMPLE_RATE as f32).sin()).clamp(0.0, 1.2);
        let q = 1.0 - resonance.clamp(0.0, 0.95);

        for s in block.iter_mut() {
            self.low += f * self.band;
            let high = *s - self.low - q * self.band;
            self.band += f * high;
            *s = match kind {
                FilterKind::LowPass => self.low,
                FilterKind::HighPass => high,
                FilterKind::BandPass => self.band,
                FilterKind::None => *s,
            };
        }
    }

    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }
}

/// Low/mid crossover of the EQ, Hz.
const EQ_LOW_HZ: f32 = 300.0;
/// Mid/high crossover of the EQ, Hz.
const EQ_HIGH_HZ: f32 = 3000.0;

/// Master three-band EQ: two one-pole crossovers split the mix into
/// low/mid/high, each scaled by its gain and recombined.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreeBandEq {
    lp_low: f32,
    lp_high: f32,
}

impl ThreeBandEq {
    pub fn process(&mut self, block: &mut Block, low_gain: f32, mid_gain: f32, high_gain: f32) {
        let a_low = (TAU * EQ_LOW_HZ / SAMPLE_RATE as f32).min(1.0);
        let a_high = (TAU * EQ_HIGH_HZ / SAMPLE_RATE as f32).min(1.0);

        for s in block.iter_mut() {
            self.lp_low += a_low * (*s - self.lp_low);
            self.lp_high += a_high * (*s - self.lp_high);
            let low = self.lp_low;
            let high = *s - self.lp_high;
            let mid = *s - low - high;
            *s = low * low_gain + mid * mid_gain + high * high_gain;
        }
    }
}
