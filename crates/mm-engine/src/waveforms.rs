//! Per-voice waveform renderers.
//!
//! Dispatch is a flat match over the closed `Waveform` tag. Every
//! renderer fills a scratch block, the voice filter runs over it, and the
//! result accumulates into the worker's half-mix. Play-head state lives
//! in the persistent record and advances here.

use core::f32::consts::TAU;
use rand::rngs::SmallRng;
use rand::Rng;

use mm_ir::{Block, OscState, Waveform, WavetableBank, BLOCK_SIZE, SAMPLE_RATE};

use crate::algorithm;
use crate::filter::FilterState;
use crate::modulate::Snapshot;

/// Delay-line capacity for the plucked string; bounds the lowest
/// renderable string frequency to about 21 Hz.
pub const STRING_MAX: usize = 2048;

/// Karplus-Strong delay line state, one per oscillator.
#[derive(Clone)]
pub struct StringState {
    buf: [f32; STRING_MAX],
    len: usize,
    pos: usize,
}

impl Default for StringState {
    fn default() -> Self {
        Self { buf: [0.0; STRING_MAX], len: 0, pos: 0 }
    }
}

impl StringState {
    /// Re-excite the line with a noise burst sized for `freq`.
    fn pluck(&mut self, freq: f32, rng: &mut SmallRng) {
        let len = (SAMPLE_RATE as f32 / freq.max(22.0)) as usize;
        self.len = len.clamp(2, STRING_MAX);
        self.pos = 0;
        for s in self.buf[..self.len].iter_mut() {
            *s = rng.gen_range(-1.0..1.0);
        }
    }

    /// One step of the averaging loop. `damp` < 1 decays the string.
    fn tick(&mut self, damp: f32) -> f32 {
        let out = self.buf[self.pos];
        let next = self.buf[(self.pos + 1) % self.len];
        self.buf[self.pos] = damp * 0.5 * (out + next);
        self.pos = (self.pos + 1) % self.len;
        out
    }
}

/// Render one voice for one block, accumulating into `out`.
pub fn render_voice(
    snap: &mut Snapshot,
    osc: &mut OscState,
    string: &mut StringState,
    filter: &mut FilterState,
    rng: &mut SmallRng,
    tables: &WavetableBank,
    out: &mut Block,
) {
    let mut tmp = [0.0f32; BLOCK_SIZE];
    let amp = snap.amp;
    let inc = snap.freq / SAMPLE_RATE as f32;

    match snap.wave {
        Waveform::Sine => {
            let mut ph = osc.phase;
            for s in tmp.iter_mut() {
                *s = (TAU * ph).sin() * amp;
                ph = advance(ph, inc);
            }
            osc.phase = ph;
        }
        Waveform::Pulse => {
            let mut ph = osc.phase;
            for s in tmp.iter_mut() {
                *s = if ph < snap.duty { amp } else { -amp };
                ph = advance(ph, inc);
            }
            osc.phase = ph;
        }
        Waveform::Saw => {
            let mut ph = osc.phase;
            for s in tmp.iter_mut() {
                *s = (2.0 * ph - 1.0) * amp;
                ph = advance(ph, inc);
            }
            osc.phase = ph;
        }
        Waveform::Triangle => {
            let mut ph = osc.phase;
            for s in tmp.iter_mut() {
                *s = (4.0 * (ph - 0.5).abs() - 1.0) * amp;
                ph = advance(ph, inc);
            }
            osc.phase = ph;
        }
        Waveform::Noise => {
            for s in tmp.iter_mut() {
                *s = rng.gen_range(-1.0f32..1.0) * amp;
            }
        }
        Waveform::Pluck => {
            if osc.pluck_pending {
                string.pluck(snap.freq, rng);
                osc.pluck_pending = false;
            }
            if string.len >= 2 {
                // feedback 0-1 stretches the decay toward lossless
                let damp = 0.990 + 0.009 * snap.feedback.clamp(0.0, 1.0);
                for s in tmp.iter_mut() {
                    *s = string.tick(damp) * amp;
                }
            }
        }
        Waveform::Sample => {
            if let Some(table) = tables.by_index(snap.table).filter(|t| !t.is_empty()) {
                let len = table.len() as u64;
                let inc16 = (table.len() as f32 * inc * 65536.0) as u64;
                let mut acc = ((osc.step as u64) << 16) | osc.sub_step as u64;
                for s in tmp.iter_mut() {
                    *s = table.at(osc.step, osc.sub_step) * amp;
                    acc = (acc + inc16) % (len << 16);
                    osc.step = (acc >> 16) as u32;
                    osc.sub_step = (acc & 0xFFFF) as u16;
                }
            }
        }
        Waveform::Algorithm => {
            if let Some(ref mut algo) = snap.algo {
                algorithm::render(algo, amp, snap.feedback, &mut tmp);
            }
        }
    }

    filter.process(snap.filter, snap.filter_freq, snap.resonance, &mut tmp);
    for (o, s) in out.iter_mut().zip(&tmp) {
        *o += *s;
    }
}

#[inline]
fn advance(phase: f32, inc: f32) -> f32 {
    let p = phase + inc;
    if p >= 1.0 {
        p - 1.0
    } else {
        p
    }
}
