//! Per-block derivation of the "sounding" parameter snapshot.
//!
//! Each block, every audible voice's persistent record is combined with
//! its ADSR scale (multiplicative) and its modulation-source sample
//! (additive) into a transient `Snapshot`. The snapshot is what the
//! waveform renderers read; it never outlives the block. Operator
//! sub-oscillators of an algorithm voice are gathered into the voice's
//! snapshot before the render fork and their play-heads written back
//! after the join, so the two worker halves stay disjoint.

use arrayvec::ArrayVec;
use core::f32::consts::TAU;

use mm_ir::{
    adsr_scale, target, AdsrPhase, FilterKind, OscState, OscStatus, Waveform, BLOCK_SIZE,
    OSC_COUNT, SAMPLE_RATE,
};

use crate::bank::Bank;

/// One operator of an algorithm voice, flattened for the render pass.
#[derive(Clone, Copy, Debug)]
pub struct OpSnapshot {
    /// Bank index of the sub-oscillator (same half as the voice).
    pub idx: usize,
    /// Operator frequency, Hz (voice frequency x ratio).
    pub freq: f32,
    /// Operator level with its envelope already applied.
    pub amp: f32,
    /// Play-head in, play-head out (written back after the join).
    pub phase: f32,
    /// False when the slot is empty or its status was cleared.
    pub active: bool,
}

const INACTIVE_OP: OpSnapshot =
    OpSnapshot { idx: 0, freq: 0.0, amp: 0.0, phase: 0.0, active: false };

/// Gathered operator state for one algorithm voice.
#[derive(Clone, Copy, Debug)]
pub struct AlgoSnapshot {
    pub algorithm: u8,
    pub ops: [OpSnapshot; 6],
}

/// The sounding parameters of one voice for one block.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    pub idx: usize,
    pub wave: Waveform,
    pub freq: f32,
    pub amp: f32,
    pub duty: f32,
    pub feedback: f32,
    pub filter: FilterKind,
    pub filter_freq: f32,
    pub resonance: f32,
    pub table: u8,
    pub algo: Option<AlgoSnapshot>,
}

/// Derive snapshots for every sounding voice, advancing status machines.
///
/// Promotes due `Scheduled` voices to `Audible` and retires voices whose
/// release has completed.
pub fn derive_block(bank: &mut Bank, now_ms: u64) -> ArrayVec<Snapshot, OSC_COUNT> {
    let mut out = ArrayVec::new();

    for i in 0..OSC_COUNT {
        if bank.oscs[i].status == OscStatus::Scheduled && now_ms >= bank.oscs[i].on_clock {
            bank.oscs[i].status = OscStatus::Audible;
        }
        if bank.oscs[i].status != OscStatus::Audible {
            continue;
        }

        // Records are Copy; working on a copy keeps the cross-oscillator
        // reads below borrow-friendly.
        let rec = bank.oscs[i];
        let (env, phase) = adsr_scale(&rec.adsr, rec.on_clock, rec.off_clock, now_ms);
        if phase == AdsrPhase::Finished {
            bank.oscs[i].status = OscStatus::Off;
            bank.oscs[i].on_clock = 0;
            bank.oscs[i].off_clock = 0;
            continue;
        }

        let mut snap = Snapshot {
            idx: i,
            wave: rec.wave,
            freq: rec.freq * rec.ratio,
            amp: rec.amp,
            duty: rec.duty,
            feedback: rec.feedback,
            filter: rec.filter,
            filter_freq: rec.filter_freq,
            resonance: rec.resonance,
            table: rec.table,
            algo: None,
        };

        let adsr_mask = if rec.adsr_targets == 0 { target::AMP } else { rec.adsr_targets };
        scale_targets(&mut snap, adsr_mask, |v| v * env);

        if let Some(src) = rec.mod_source {
            let sample = preview_sample(&bank.oscs[src as usize]);
            let mod_mask = if rec.mod_targets == 0 { target::AMP } else { rec.mod_targets };
            scale_targets(&mut snap, mod_mask, |v| v + v * sample);
        }

        if rec.wave == Waveform::Algorithm {
            snap.algo = Some(gather_ops(bank, &rec, snap.freq, now_ms));
        }
        out.push(snap);
    }
    out
}

/// Apply `f` to every parameter selected by the target bitmask.
fn scale_targets<F: Fn(f32) -> f32>(snap: &mut Snapshot, mask: u8, f: F) {
    if mask & target::AMP != 0 {
        snap.amp = f(snap.amp).max(0.0);
    }
    if mask & target::DUTY != 0 {
        snap.duty = f(snap.duty).clamp(0.01, 0.99);
    }
    if mask & target::FREQ != 0 {
        snap.freq = f(snap.freq).max(0.0);
    }
    if mask & target::FILTER_FREQ != 0 {
        snap.filter_freq = f(snap.filter_freq).max(0.0);
    }
    if mask & target::RESONANCE != 0 {
        snap.resonance = f(snap.resonance).clamp(0.0, 1.0);
    }
}

/// Headless one-block render of a modulation source, reduced to one
/// representative sample in [-1, 1].
///
/// Works on a copy of the play-head so the source's persistent state
/// never advances from here. Non-analytic waveforms evaluate as a sine
/// at their frequency.
fn preview_sample(src: &OscState) -> f32 {
    let advanced = src.phase + src.freq * src.ratio * BLOCK_SIZE as f32 / SAMPLE_RATE as f32;
    let ph = advanced.fract();
    match src.wave {
        Waveform::Pulse => {
            if ph < src.duty {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Saw => 2.0 * ph - 1.0,
        Waveform::Triangle => 4.0 * (ph - 0.5).abs() - 1.0,
        _ => (TAU * ph).sin(),
    }
}

/// Collect the operator sub-oscillators of an algorithm voice.
fn gather_ops(bank: &Bank, voice: &OscState, voice_freq: f32, now_ms: u64) -> AlgoSnapshot {
    let mut ops = [INACTIVE_OP; 6];
    for (slot, op) in ops.iter_mut().enumerate() {
        let Some(src) = voice.algo_sources[slot] else { continue };
        let rec = &bank.oscs[src as usize];
        if rec.status != OscStatus::AlgoSource {
            continue;
        }
        let (env, phase) = adsr_scale(&rec.adsr, rec.on_clock, rec.off_clock, now_ms);
        if phase == AdsrPhase::Finished {
            continue;
        }
        *op = OpSnapshot {
            idx: src as usize,
            freq: voice_freq * rec.ratio,
            amp: rec.amp * env,
            phase: rec.phase,
            active: true,
        };
    }
    AlgoSnapshot { algorithm: voice.algorithm, ops }
}

/// Persist operator play-heads mutated during the render.
pub fn write_back(bank: &mut Bank, snaps: &[Snapshot]) {
    for snap in snaps {
        let Some(ref algo) = snap.algo else { continue };
        for op in algo.ops.iter().filter(|o| o.active) {
            bank.oscs[op.idx].phase = op.phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_ir::{Delta, ParamTag};

    fn audible(bank: &mut Bank, i: usize, now: u64) {
        bank.apply(&Delta::new(now, i as u8, ParamTag::Trigger, 1.0), now);
    }

    #[test]
    fn silent_bank_derives_nothing() {
        let mut bank = Bank::new();
        assert!(derive_block(&mut bank, 100).is_empty());
    }

    #[test]
    fn audible_voice_snapshots() {
        let mut bank = Bank::new();
        bank.oscs[2].freq = 880.0;
        audible(&mut bank, 2, 50);
        let snaps = derive_block(&mut bank, 60);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].idx, 2);
        assert_eq!(snaps[0].freq, 880.0);
    }

    #[test]
    fn envelope_scales_amplitude_only_by_default() {
        let mut bank = Bank::new();
        bank.oscs[0].freq = 440.0;
        bank.oscs[0].adsr.attack_ms = 1000.0;
        audible(&mut bank, 0, 0);
        // Early in a long attack the amp is far below the record's 1.0
        let snaps = derive_block(&mut bank, 10);
        assert!(snaps[0].amp < 0.2);
        assert_eq!(snaps[0].freq, 440.0);
    }

    #[test]
    fn finished_release_turns_voice_off() {
        let mut bank = Bank::new();
        audible(&mut bank, 1, 0);
        bank.apply(&Delta::new(100, 1, ParamTag::Trigger, 0.0), 100);
        let release = bank.oscs[1].adsr.release_ms as u64;
        let snaps = derive_block(&mut bank, 100 + release + 10);
        assert!(snaps.is_empty());
        assert_eq!(bank.oscs[1].status, OscStatus::Off);
        assert_eq!(bank.oscs[1].off_clock, 0);
    }

    #[test]
    fn scheduled_promotes_when_due() {
        let mut bank = Bank::new();
        bank.apply(&Delta::new(500, 3, ParamTag::Trigger, 1.0), 100);
        assert_eq!(bank.oscs[3].status, OscStatus::Scheduled);
        assert!(derive_block(&mut bank, 200).is_empty());
        let snaps = derive_block(&mut bank, 500);
        assert_eq!(snaps.len(), 1);
        assert_eq!(bank.oscs[3].status, OscStatus::Audible);
    }

    #[test]
    fn mod_source_shifts_targets_additively() {
        let mut bank = Bank::new();
        bank.oscs[0].freq = 100.0;
        bank.oscs[0].mod_targets = target::FREQ;
        // Source parked at a phase that previews to a known non-zero value.
        bank.oscs[4].wave = Waveform::Saw;
        bank.oscs[4].freq = 0.0;
        bank.oscs[4].phase = 0.75;
        bank.oscs[0].mod_source = Some(4);
        audible(&mut bank, 0, 0);
        let snaps = derive_block(&mut bank, 0);
        // saw at phase 0.75 previews to 0.5: freq -> 100 + 100*0.5
        assert!((snaps[0].freq - 150.0).abs() < 1e-3);
    }

    #[test]
    fn algo_voice_gathers_only_flagged_ops() {
        let mut bank = Bank::new();
        bank.oscs[0].wave = Waveform::Algorithm;
        bank.oscs[0].algo_sources[0] = Some(1);
        bank.oscs[0].algo_sources[1] = Some(2);
        for i in [1usize, 2] {
            bank.oscs[i].status = OscStatus::AlgoSource;
            bank.oscs[i].on_clock = 1;
        }
        bank.oscs[2].status = OscStatus::Off; // cleared, must not gather
        audible(&mut bank, 0, 10);
        let snaps = derive_block(&mut bank, 10);
        let algo = snaps[0].algo.unwrap();
        assert!(algo.ops[0].active);
        assert!(!algo.ops[1].active);
    }

    #[test]
    fn write_back_persists_op_phase() {
        let mut bank = Bank::new();
        let mut snap = Snapshot {
            idx: 0,
            wave: Waveform::Algorithm,
            freq: 100.0,
            amp: 1.0,
            duty: 0.5,
            feedback: 0.0,
            filter: FilterKind::None,
            filter_freq: 0.0,
            resonance: 0.0,
            table: 0,
            algo: Some(AlgoSnapshot {
                algorithm: 0,
                ops: {
                    let mut ops = [INACTIVE_OP; 6];
                    ops[0] = OpSnapshot { idx: 5, freq: 100.0, amp: 1.0, phase: 0.25, active: true };
                    ops
                },
            }),
        };
        snap.algo.as_mut().unwrap().ops[0].phase = 0.5;
        write_back(&mut bank, &[snap]);
        assert_eq!(bank.oscs[5].phase, 0.5);
    }
}
