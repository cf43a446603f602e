//! FM operator-routing graph.
//!
//! A fixed table of 32 six-operator topologies (the classic DX7 set)
//! describes, per operator slot: which modulation bus feeds it, which bus
//! (or the final output) receives it, whether it sums or overwrites, and
//! whether it takes the voice-level feedback. Rendering walks the slots
//! in fixed descending order over five scratch buffers.

use core::f32::consts::TAU;

use mm_ir::{Block, BLOCK_SIZE, SAMPLE_RATE};

use crate::modulate::AlgoSnapshot;

/// Phase-modulation depth applied to the selected input bus.
const PM_DEPTH: f32 = TAU;

/// Scale for the voice-level feedback coefficient.
const FB_SCALE: f32 = 0.25;

/// Modulation input selection for one operator slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum In {
    None,
    A,
    B,
}

/// Output routing for one operator slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Out {
    A,
    B,
    /// Additive to the final voice output.
    Mix,
}

/// One slot of a topology.
#[derive(Clone, Copy, Debug)]
pub struct OpRoute {
    pub input: In,
    pub out: Out,
    /// Sum into the destination instead of overwriting it.
    pub sum: bool,
    /// This slot receives the voice-level feedback.
    pub feedback: bool,
}

const fn r(input: In, out: Out, sum: bool, feedback: bool) -> OpRoute {
    OpRoute { input, out, sum, feedback }
}

/// Slot routes in operator order (index 0 = op 1, the usual carrier).
pub type Topology = [OpRoute; 6];

/// The 32 routing topologies. Entry comments read `modulator -> carrier`,
/// with the feedback operator marked `*`.
pub static ALGORITHMS: [Topology; 32] = [
    // 1: 2->1, 6*->5->4->3->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true)],
    // 2: 2*->1, 6->5->4->3->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, true), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 3: 6*->5->4->1, 3->2->1
    [r(In::A, Out::Mix, true, false), r(In::B, Out::A, true, false), r(In::None, Out::B, false, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true)],
    // 4: 6->5->4*->1, 3->2->1
    [r(In::A, Out::Mix, true, false), r(In::B, Out::A, true, false), r(In::None, Out::B, false, false), r(In::A, Out::A, false, true), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 5: 6->5->4->1, 3->1, 2*->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, true), r(In::None, Out::A, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 6: 6->5*->4->1, 3->1, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, false), r(In::None, Out::A, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, true), r(In::None, Out::A, false, false)],
    // 7: 6*->5->4->3->1, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true)],
    // 8: 6->5->4*->3->1, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, true), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 9: 6*->5->1, 4->1, 3->1, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, false), r(In::None, Out::A, true, false), r(In::None, Out::A, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true)],
    // 10: 6->5->1, 4->1, 3*->1, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, false), r(In::None, Out::A, true, true), r(In::None, Out::A, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 11: 6*->1, 5->1, 4->1, 3->1, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, true, false), r(In::None, Out::A, true, false), r(In::None, Out::A, true, false), r(In::None, Out::A, true, false), r(In::None, Out::A, false, true)],
    // 12: 6->5->4->3, 2*->1
    [r(In::B, Out::Mix, true, false), r(In::None, Out::B, false, true), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 13: 6*->5->4->3, 2->1
    [r(In::B, Out::Mix, true, false), r(In::None, Out::B, false, false), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true)],
    // 14: 6->5->4*->3, 2->1
    [r(In::B, Out::Mix, true, false), r(In::None, Out::B, false, false), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, true), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 15: 6->5, 4->3, 2*->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false)],
    // 16: 6->5, 4*->3, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false)],
    // 17: 6*->5, 4->3, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true)],
    // 18: 6->5->4, 3*->2->1
    [r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 19: 6*->5->4, 3->2->1
    [r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true)],
    // 20: 6*, 5->4->3, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false), r(In::None, Out::Mix, true, true)],
    // 21: 6, 5*->4->3, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true), r(In::None, Out::Mix, true, false)],
    // 22: 6, 5->4->3, 2*->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false), r(In::None, Out::Mix, true, false)],
    // 23: 6*->5, 4->3, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true)],
    // 24: 6->5, 4*->3, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false)],
    // 25: 6->5, 4->3, 2*->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false)],
    // 26: 6*, 5, 4->3, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, true)],
    // 27: 6*->5, 4, 3, 2->1
    [r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, false), r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true)],
    // 28: 6*->5, 4, 3, 2, 1
    [r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true)],
    // 29: 6*, 5, 4, 3, 2, 1
    [r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, false), r(In::None, Out::Mix, true, true)],
    // 30: 6->5->4, 3*->2->1
    [r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true), r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false)],
    // 31: 6*->5, 4->3->2->1
    [r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, false), r(In::A, Out::Mix, true, false), r(In::None, Out::A, false, true)],
    // 32: 6*->5->4->3->2->1
    [r(In::A, Out::Mix, true, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::A, Out::A, false, false), r(In::None, Out::A, false, true)],
];

static ZERO: Block = [0.0; BLOCK_SIZE];

/// Render one algorithm voice into `out` (overwritten, then scaled by
/// `voice_amp`). Operator play-heads advance in the snapshot; the caller
/// writes them back to the bank after the join.
pub fn render(algo: &mut AlgoSnapshot, voice_amp: f32, feedback: f32, out: &mut Block) {
    let topology = &ALGORITHMS[algo.algorithm as usize % ALGORITHMS.len()];
    let mut bus_a = [0.0f32; BLOCK_SIZE];
    let mut bus_b = [0.0f32; BLOCK_SIZE];
    let mut tmp = [0.0f32; BLOCK_SIZE];
    out.fill(0.0);
    let fb = feedback * FB_SCALE;

    for slot in (0..6).rev() {
        let route = &topology[slot];
        let op = &mut algo.ops[slot];
        if !op.active {
            continue;
        }

        let input: &Block = match route.input {
            In::None => &ZERO,
            In::A => &bus_a,
            In::B => &bus_b,
        };
        let inc = op.freq / SAMPLE_RATE as f32;
        let mut ph = op.phase;
        let mut prev = 0.0f32;
        for (t, m) in tmp.iter_mut().zip(input.iter()) {
            let fb_term = if route.feedback { fb * prev } else { 0.0 };
            let s = (TAU * ph + PM_DEPTH * m + fb_term).sin();
            prev = s;
            *t = s * op.amp;
            ph += inc;
            if ph >= 1.0 {
                ph -= 1.0;
            }
        }
        op.phase = ph;

        let dest: &mut Block = match route.out {
            Out::A => &mut bus_a,
            Out::B => &mut bus_b,
            Out::Mix => &mut *out,
        };
        if route.sum {
            for (d, t) in dest.iter_mut().zip(&tmp) {
                *d += *t;
            }
        } else {
            dest.copy_from_slice(&tmp);
        }
    }

    for s in out.iter_mut() {
        *s *= voice_amp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulate::OpSnapshot;

    fn voice(active: [bool; 6], algorithm: u8) -> AlgoSnapshot {
        let mut ops = [OpSnapshot { idx: 0, freq: 0.0, amp: 0.0, phase: 0.0, active: false }; 6];
        for (slot, op) in ops.iter_mut().enumerate() {
            op.idx = slot + 1;
            op.freq = 220.0 * (slot as f32 + 1.0);
            op.amp = 0.8;
            op.active = active[slot];
        }
        AlgoSnapshot { algorithm, ops }
    }

    fn render_once(algo: &mut AlgoSnapshot) -> Block {
        let mut out = [0.0; BLOCK_SIZE];
        render(algo, 1.0, 0.0, &mut out);
        out
    }

    fn peak(b: &Block) -> f32 {
        b.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn every_topology_has_a_mix_output() {
        for (i, topology) in ALGORITHMS.iter().enumerate() {
            assert!(
                topology.iter().any(|r| r.out == Out::Mix),
                "algorithm {} routes nothing to the output",
                i
            );
        }
    }

    #[test]
    fn every_topology_has_exactly_one_feedback_slot() {
        for (i, topology) in ALGORITHMS.iter().enumerate() {
            let n = topology.iter().filter(|r| r.feedback).count();
            assert_eq!(n, 1, "algorithm {} has {} feedback slots", i, n);
        }
    }

    #[test]
    fn entry_zero_sounds_while_chain_is_active() {
        let mut algo = voice([true; 6], 0);
        assert!(peak(&render_once(&mut algo)) > 0.0);
    }

    #[test]
    fn clearing_all_ops_silences_the_voice() {
        let mut algo = voice([false; 6], 0);
        assert_eq!(peak(&render_once(&mut algo)), 0.0);
    }

    #[test]
    fn modulation_changes_the_carrier_output() {
        // Carrier alone vs carrier + modulator chain must differ.
        let mut plain = voice([true, false, false, false, false, false], 0);
        let mut modulated = voice([true, true, false, false, false, false], 0);
        let a = render_once(&mut plain);
        let b = render_once(&mut modulated);
        let diff: f32 = a.iter().zip(&b).map(|(x, y)| (x - y).abs()).sum();
        assert!(diff > 0.1, "modulator had no effect");
    }

    #[test]
    fn voice_amp_scales_output() {
        let mut algo = voice([true; 6], 0);
        let full = peak(&render_once(&mut algo));
        let mut algo = voice([true; 6], 0);
        let mut out = [0.0; BLOCK_SIZE];
        render(&mut algo, 0.5, 0.0, &mut out);
        assert!((peak(&out) - full * 0.5).abs() < 1e-3);
    }

    #[test]
    fn op_phases_advance() {
        let mut algo = voice([true; 6], 0);
        render_once(&mut algo);
        for op in algo.ops.iter() {
            assert!(op.phase > 0.0);
        }
    }

    #[test]
    fn feedback_changes_the_spectrum() {
        let mut a = voice([true; 6], 31); // single chain, fb on op 6
        let mut b = voice([true; 6], 31);
        let mut out_a = [0.0; BLOCK_SIZE];
        let mut out_b = [0.0; BLOCK_SIZE];
        render(&mut a, 1.0, 0.0, &mut out_a);
        render(&mut b, 1.0, 4.0, &mut out_b);
        let diff: f32 = out_a.iter().zip(&out_b).map(|(x, y)| (x - y).abs()).sum();
        assert!(diff > 0.1);
    }
}
