//! Built-in FM patch presets.
//!
//! A patch names an algorithm table entry plus per-operator frequency
//! ratios, amplitudes and envelope breakpoints. Applying one copies these
//! into the voice's operator sub-oscillators and starts each.

use crate::adsr::AdsrParams;

/// Parameters for one operator slot.
#[derive(Clone, Copy, Debug)]
pub struct OpPatch {
    /// Frequency ratio relative to the voice frequency.
    pub ratio: f32,
    /// Operator output level 0-1. Zero disables the slot.
    pub amp: f32,
    pub adsr: AdsrParams,
}

const fn op(ratio: f32, amp: f32, a: f32, d: f32, s: f32, r: f32) -> OpPatch {
    OpPatch {
        ratio,
        amp,
        adsr: AdsrParams { attack_ms: a, decay_ms: d, sustain: s, release_ms: r },
    }
}

const OFF: OpPatch = op(1.0, 0.0, 1.0, 1.0, 0.0, 1.0);

/// A named FM preset.
#[derive(Clone, Copy, Debug)]
pub struct Patch {
    pub name: &'static str,
    /// Algorithm table entry (0-31).
    pub algorithm: u8,
    /// Operator slots 1-6 (index 0 = op 1, the usual carrier).
    pub ops: [OpPatch; 6],
}

/// The preset table. Wire `p` values wrap modulo this length.
pub static PATCHES: [Patch; 3] = [
    // Two carriers, bright tine partial decaying faster than the body.
    Patch {
        name: "epiano",
        algorithm: 4,
        ops: [
            op(1.0, 1.0, 2.0, 600.0, 0.0, 300.0),
            op(14.0, 0.2, 1.0, 80.0, 0.0, 80.0),
            op(1.0, 0.5, 2.0, 400.0, 0.0, 250.0),
            op(1.0, 0.35, 2.0, 300.0, 0.0, 200.0),
            OFF,
            OFF,
        ],
    },
    // Inharmonic modulator ratio for the clang, long carrier tail.
    Patch {
        name: "bell",
        algorithm: 2,
        ops: [
            op(1.0, 1.0, 1.0, 2500.0, 0.0, 1500.0),
            op(3.5, 0.6, 1.0, 900.0, 0.0, 600.0),
            op(1.0, 0.4, 1.0, 2000.0, 0.0, 1200.0),
            op(3.5, 0.5, 1.0, 700.0, 0.0, 500.0),
            OFF,
            OFF,
        ],
    },
    // Slow attack stack, sustained modulation for the blown edge.
    Patch {
        name: "brass",
        algorithm: 17,
        ops: [
            op(1.0, 1.0, 80.0, 300.0, 0.8, 200.0),
            op(1.0, 0.7, 60.0, 250.0, 0.6, 180.0),
            op(1.0, 0.6, 90.0, 300.0, 0.7, 200.0),
            op(2.0, 0.3, 60.0, 200.0, 0.5, 150.0),
            op(1.0, 0.5, 100.0, 300.0, 0.7, 220.0),
            op(1.0, 0.4, 70.0, 250.0, 0.5, 180.0),
        ],
    },
];

/// Look up a preset by wire value, wrapping modulo the table length.
pub fn patch(index: u8) -> &'static Patch {
    &PATCHES[index as usize % PATCHES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_wraps() {
        assert_eq!(patch(0).name, "epiano");
        assert_eq!(patch(PATCHES.len() as u8).name, "epiano");
        assert_eq!(patch(1).name, "bell");
    }

    #[test]
    fn all_patches_have_a_live_carrier() {
        for p in &PATCHES {
            assert!(p.ops[0].amp > 0.0, "{} has no carrier", p.name);
            assert!((p.algorithm as usize) < 32);
        }
    }
}
