//! Block-fill engine: drain, snapshot, fork/join render, mix, clip.

use std::sync::{Arc, Mutex};

use heapless::Vec as FixedVec;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use mm_ir::{
    Block, Delta, Frame, OscState, ParamTag, Sysclock, WavetableBank, BLOCK_SIZE, OSC_COUNT,
};

use crate::bank::{Bank, HALF};
use crate::filter::{FilterState, ThreeBandEq};
use crate::modulate::{self, Snapshot};
use crate::queue::DeltaQueue;
use crate::waveforms::{self, StringState};

/// Most deltas applied per block; the rest stay queued for the next one.
const DRAIN_MAX: usize = 64;

/// Samples at or below this magnitude pass the clipper linearly
/// (about 90% of full scale).
const CLIP_LINEAR: f32 = 29491.0;

/// Absolute ceiling; at or beyond it the clipper saturates to full scale.
const CLIP_CEIL: f32 = 98304.0;

const CLIP_LUT_LEN: usize = 1024;

/// Precomputed soft-clip curve mapping excess magnitude above the linear
/// threshold into the remaining headroom.
pub struct SoftClip {
    lut: Vec<i16>,
}

impl Default for SoftClip {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftClip {
    pub fn new() -> Self {
        let norm = 1.0 - (-3.0f32).exp();
        let lut = (0..CLIP_LUT_LEN)
            .map(|k| {
                let t = k as f32 / (CLIP_LUT_LEN - 1) as f32;
                let compressed = (i16::MAX as f32 - CLIP_LINEAR) * (1.0 - (-3.0 * t).exp()) / norm;
                (CLIP_LINEAR + compressed) as i16
            })
            .collect();
        Self { lut }
    }

    /// Clip one sample (i16 domain, f32 precision) to a 16-bit value.
    pub fn apply(&self, sample: f32) -> i16 {
        let mag = sample.abs();
        let clipped = if mag <= CLIP_LINEAR {
            mag as i16
        } else if mag >= CLIP_CEIL {
            i16::MAX
        } else {
            let t = (mag - CLIP_LINEAR) / (CLIP_CEIL - CLIP_LINEAR);
            self.lut[(t * (CLIP_LUT_LEN - 1) as f32) as usize]
        };
        if sample < 0.0 {
            -clipped
        } else {
            clipped
        }
    }
}

/// The audio-side engine. One per unit.
///
/// Owns the bank and all render state; shares the delta queue with the
/// network producer and the sysclock with everything that schedules.
pub struct Engine {
    bank: Bank,
    queue: Arc<Mutex<DeltaQueue>>,
    clock: Sysclock,
    tables: WavetableBank,
    strings: Vec<StringState>,
    filters: [FilterState; OSC_COUNT],
    eq: ThreeBandEq,
    clip: SoftClip,
    rng_lo: SmallRng,
    rng_hi: SmallRng,
    drain: FixedVec<Delta, DRAIN_MAX>,
}

impl Engine {
    pub fn new(queue: Arc<Mutex<DeltaQueue>>, clock: Sysclock) -> Self {
        Self {
            bank: Bank::new(),
            queue,
            clock,
            tables: WavetableBank::builtin(),
            strings: vec![StringState::default(); OSC_COUNT],
            filters: [FilterState::default(); OSC_COUNT],
            eq: ThreeBandEq::default(),
            clip: SoftClip::new(),
            rng_lo: SmallRng::seed_from_u64(0x6d75726d),
            rng_hi: SmallRng::seed_from_u64(0x75720a0a),
            drain: FixedVec::new(),
        }
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn clock(&self) -> &Sysclock {
        &self.clock
    }

    /// Apply a delta immediately, bypassing the queue. Local control
    /// surface and tests; network changes go through the queue.
    pub fn apply_now(&mut self, delta: Delta) {
        let now = self.clock.now_ms();
        self.bank.apply(&delta, now);
    }

    /// Produce one block of output frames.
    ///
    /// Drains due deltas under the queue lock (and only that long),
    /// derives snapshots, forks the two half-bank workers, joins, then
    /// mixes, EQs and soft-clips into 16-bit frames. Advances the
    /// sysclock by exactly one block; nothing else advances it.
    pub fn render_block(&mut self, frames: &mut [Frame; BLOCK_SIZE]) {
        let now = self.clock.now_ms();

        self.drain.clear();
        {
            let mut queue = self.queue.lock().unwrap();
            queue.drain_due(now, &mut self.drain);
        }
        for delta in &self.drain {
            if delta.tag == ParamTag::Debug {
                debug_dump(&self.bank, &self.queue, delta.value as i32);
            } else {
                self.bank.apply(delta, now);
            }
        }

        let mut snaps = modulate::derive_block(&mut self.bank, now);

        let mut mix_lo: Block = [0.0; BLOCK_SIZE];
        let mut mix_hi: Block = [0.0; BLOCK_SIZE];
        {
            let split = snaps.iter().position(|s| s.idx >= HALF).unwrap_or(snaps.len());
            let (snaps_lo, snaps_hi) = snaps.split_at_mut(split);
            let (oscs_lo, oscs_hi) = self.bank.oscs.split_at_mut(HALF);
            let (strings_lo, strings_hi) = self.strings.split_at_mut(HALF);
            let (filters_lo, filters_hi) = self.filters.split_at_mut(HALF);
            let (rng_lo, rng_hi) = (&mut self.rng_lo, &mut self.rng_hi);
            let tables = &self.tables;

            std::thread::scope(|scope| {
                scope.spawn(|| {
                    render_half(snaps_lo, oscs_lo, 0, strings_lo, filters_lo, rng_lo, tables, &mut mix_lo);
                });
                scope.spawn(|| {
                    render_half(snaps_hi, oscs_hi, HALF, strings_hi, filters_hi, rng_hi, tables, &mut mix_hi);
                });
            });
        }
        modulate::write_back(&mut self.bank, &snaps);

        let globals = self.bank.globals;
        let gain = 0.1 * globals.master_volume;
        let mut mix: Block = [0.0; BLOCK_SIZE];
        for (m, (lo, hi)) in mix.iter_mut().zip(mix_lo.iter().zip(&mix_hi)) {
            *m = (lo + hi) * gain;
        }
        self.eq.process(&mut mix, globals.eq_low, globals.eq_mid, globals.eq_high);

        for (frame, s) in frames.iter_mut().zip(&mix) {
            *frame = Frame::mono(self.clip.apply(s * i16::MAX as f32));
        }

        self.clock.advance(BLOCK_SIZE as u64);
    }

    /// Render `count` blocks into a frame vector (offline paths, tests).
    pub fn render_blocks(&mut self, count: usize) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(count * BLOCK_SIZE);
        let mut block = [Frame::silence(); BLOCK_SIZE];
        for _ in 0..count {
            self.render_block(&mut block);
            frames.extend_from_slice(&block);
        }
        frames
    }
}

/// Render every snapshot belonging to one bank half into its mix buffer.
#[allow(clippy::too_many_arguments)]
fn render_half(
    snaps: &mut [Snapshot],
    oscs: &mut [OscState],
    base: usize,
    strings: &mut [StringState],
    filters: &mut [FilterState],
    rng: &mut SmallRng,
    tables: &WavetableBank,
    out: &mut Block,
) {
    for snap in snaps {
        let rel = snap.idx - base;
        waveforms::render_voice(
            snap,
            &mut oscs[rel],
            &mut strings[rel],
            &mut filters[rel],
            rng,
            tables,
            out,
        );
    }
}

/// Service a `D` dump request: level 1 = globals + queue depth,
/// level 2 adds one line per oscillator.
fn debug_dump(bank: &Bank, queue: &Arc<Mutex<DeltaQueue>>, level: i32) {
    let queued = queue.lock().unwrap().len();
    tracing::info!(
        master = bank.globals.master_volume,
        eq_low = bank.globals.eq_low,
        eq_mid = bank.globals.eq_mid,
        eq_high = bank.globals.eq_high,
        queued,
        "state dump"
    );
    if level >= 2 {
        for (i, osc) in bank.oscs.iter().enumerate() {
            tracing::info!(
                osc = i,
                status = ?osc.status,
                wave = ?osc.wave,
                freq = osc.freq,
                amp = osc.amp,
                "osc dump"
            );
        }
    }
}
