//! The oscillator bank: persistent per-voice state plus globals.
//!
//! All parameter changes land here through `apply`, driven by the
//! per-block drain. Out-of-range oscillator indices wrap; malformed
//! values clamp. Nothing here returns an error; the wire protocol is
//! fire-and-forget.

use mm_ir::{
    note_to_freq, patch, Delta, FilterKind, OscState, OscStatus, ParamTag, Waveform, OSC_COUNT,
};

/// Size of one worker half of the bank.
pub const HALF: usize = OSC_COUNT / 2;

/// Process-wide mix parameters.
#[derive(Clone, Copy, Debug)]
pub struct Globals {
    /// Master volume 0-10.
    pub master_volume: f32,
    pub eq_low: f32,
    pub eq_mid: f32,
    pub eq_high: f32,
}

impl Default for Globals {
    fn default() -> Self {
        Self { master_volume: 5.0, eq_low: 1.0, eq_mid: 1.0, eq_high: 1.0 }
    }
}

/// Resolve an operator-slot oscillator index into `voice`'s bank half.
///
/// The render pipeline statically bisects the bank between two workers;
/// wrapping source indices inside the owning half keeps an algorithm
/// voice's whole chain on one worker. Patch application and the `O`
/// parameter both go through here so the two agree.
pub fn resolve_in_half(voice: usize, source: usize) -> usize {
    let half_start = if voice % OSC_COUNT < HALF { 0 } else { HALF };
    half_start + source % HALF
}

/// The fixed voice array and globals.
pub struct Bank {
    pub oscs: [OscState; OSC_COUNT],
    pub globals: Globals,
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}

impl Bank {
    pub fn new() -> Self {
        Self { oscs: [OscState::default(); OSC_COUNT], globals: Globals::default() }
    }

    /// Apply one drained delta at local time `now_ms`.
    pub fn apply(&mut self, d: &Delta, now_ms: u64) {
        let i = d.osc as usize % OSC_COUNT;
        match d.tag {
            ParamTag::Wave => {
                let w = d.value as i32;
                self.oscs[i].wave = Waveform::from_wire(w);
                if w >= 8 {
                    self.oscs[i].table = (w - 8) as u8;
                }
            }
            ParamTag::Freq => self.oscs[i].freq = d.value.max(0.0),
            ParamTag::Note => self.oscs[i].freq = note_to_freq(d.value),
            ParamTag::FreqRatio => {
                self.oscs[i].ratio = if d.value > 0.0 { d.value } else { 1.0 };
            }
            ParamTag::Trigger => {
                if d.value >= 0.5 {
                    self.trigger_on(i, d.time, now_ms);
                } else {
                    self.oscs[i].off_clock = d.time.max(1);
                }
            }
            ParamTag::Amp => self.oscs[i].amp = d.value.clamp(0.0, 1.0),
            ParamTag::Duty => self.oscs[i].duty = d.value.clamp(0.01, 0.99),
            ParamTag::Feedback => self.oscs[i].feedback = d.value.max(0.0),
            ParamTag::AdsrAttack => self.oscs[i].adsr.attack_ms = d.value.max(0.0),
            ParamTag::AdsrDecay => self.oscs[i].adsr.decay_ms = d.value.max(0.0),
            ParamTag::AdsrSustain => self.oscs[i].adsr.sustain = d.value.clamp(0.0, 1.0),
            ParamTag::AdsrRelease => self.oscs[i].adsr.release_ms = d.value.max(0.0),
            ParamTag::AdsrTargets => self.oscs[i].adsr_targets = d.value as u8,
            ParamTag::FilterFreq => self.oscs[i].filter_freq = d.value.max(0.0),
            ParamTag::FilterKind => self.oscs[i].filter = FilterKind::from_wire(d.value as i32),
            ParamTag::Resonance => self.oscs[i].resonance = d.value.clamp(0.0, 1.0),
            ParamTag::ModSource => {
                let src = d.value as usize % OSC_COUNT;
                if src == i {
                    // self-reference clears the routing
                    self.oscs[i].mod_source = None;
                } else {
                    self.oscs[i].mod_source = Some(src as u8);
                    self.oscs[src].status = OscStatus::ModSource;
                }
            }
            ParamTag::ModTargets => self.oscs[i].mod_targets = d.value as u8,
            ParamTag::Algorithm => {
                self.oscs[i].algorithm = (d.value as i32).rem_euclid(32) as u8;
            }
            ParamTag::AlgoSource(slot) => {
                let src = resolve_in_half(i, d.value as usize);
                self.oscs[i].algo_sources[slot as usize] = Some(src as u8);
                self.oscs[src].status = OscStatus::AlgoSource;
            }
            ParamTag::Patch => self.apply_patch(i, d.value as u8, d.time),
            ParamTag::Phase => self.oscs[i].phase = d.value.clamp(0.0, 1.0) % 1.0,
            ParamTag::MasterVolume => {
                self.globals.master_volume = d.value.clamp(0.0, 10.0);
            }
            ParamTag::EqLow => self.globals.eq_low = d.value.clamp(0.0, 4.0),
            ParamTag::EqMid => self.globals.eq_mid = d.value.clamp(0.0, 4.0),
            ParamTag::EqHigh => self.globals.eq_high = d.value.clamp(0.0, 4.0),
            ParamTag::Reset => {
                if d.value >= 1.0 {
                    self.reset_all();
                } else {
                    self.oscs[i].reset();
                }
            }
            // Dump requests are serviced by the engine, which owns the
            // queue statistics the dump includes.
            ParamTag::Debug => {}
        }
    }

    fn trigger_on(&mut self, i: usize, at: u64, now_ms: u64) {
        let osc = &mut self.oscs[i];
        osc.on_clock = at.max(1);
        osc.off_clock = 0;
        osc.phase = 0.0;
        osc.step = 0;
        osc.sub_step = 0;
        osc.pluck_pending = true;
        osc.status = match osc.status {
            // Source voices keep their side state; the envelope restart
            // is all a trigger means for them.
            OscStatus::ModSource | OscStatus::AlgoSource => osc.status,
            _ if now_ms >= osc.on_clock => OscStatus::Audible,
            _ => OscStatus::Scheduled,
        };
    }

    /// Copy a preset's operator table into the voice's sub-oscillators
    /// and start each of them.
    fn apply_patch(&mut self, voice: usize, index: u8, at: u64) {
        let preset = patch(index);
        self.oscs[voice].wave = Waveform::Algorithm;
        self.oscs[voice].algorithm = preset.algorithm;

        for (slot, op) in preset.ops.iter().enumerate() {
            if op.amp <= 0.0 {
                self.oscs[voice].algo_sources[slot] = None;
                continue;
            }
            let src = resolve_in_half(voice, voice + 1 + slot);
            self.oscs[voice].algo_sources[slot] = Some(src as u8);

            let sub = &mut self.oscs[src];
            sub.wave = Waveform::Sine;
            sub.ratio = op.ratio;
            sub.amp = op.amp;
            sub.adsr = op.adsr;
            sub.phase = 0.0;
            sub.on_clock = at.max(1);
            sub.off_clock = 0;
            sub.status = OscStatus::AlgoSource;
        }
    }

    fn reset_all(&mut self) {
        for osc in &mut self.oscs {
            osc.reset();
        }
        self.globals = Globals::default();
    }
}
