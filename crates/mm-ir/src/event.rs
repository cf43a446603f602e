//! The ephemeral "requested state" assembled from one wire message.

use arrayvec::ArrayVec;

use crate::delta::{Delta, ParamTag};

/// Sentinel for a field the message did not supply.
pub const UNSET: f32 = -1.0;

/// Fully-populated requested state for one message.
///
/// Every field defaults to unset (a negative sentinel) so only explicitly
/// supplied fields generate deltas. The event is destroyed right after
/// `deltas` decomposes it.
#[derive(Clone, Debug)]
pub struct ControlEvent {
    /// Remote scheduling time (`t`), ms; -1 = play immediately.
    pub time: i64,
    /// Target client/group id (`c`); -1 = broadcast.
    pub client: i32,
    /// Target oscillator (`v`); -1 defaults to oscillator 0.
    pub osc: i32,
    pub wave: f32,
    pub freq: f32,
    pub trigger: f32,
    pub amp: f32,
    pub duty: f32,
    pub feedback: f32,
    /// Attack ms, decay ms, sustain 0-1, release ms (`A` csv).
    pub adsr: [f32; 4],
    pub adsr_targets: f32,
    pub filter_freq: f32,
    pub filter_kind: f32,
    pub resonance: f32,
    pub mod_source: f32,
    pub mod_targets: f32,
    pub algorithm: f32,
    /// Operator source oscillators (`O` csv), slots 0-5.
    pub algo_sources: [f32; 6],
    pub patch: f32,
    pub phase: f32,
    pub master_volume: f32,
    pub eq_low: f32,
    pub eq_mid: f32,
    pub eq_high: f32,
    pub note: f32,
    pub ratio: f32,
    pub reset: f32,
    pub debug: f32,

    // Sync-bearing fields; these never become deltas.
    /// Remote clock (`s`), ms; -1 = absent.
    pub sync_time: i64,
    /// Sender's self-assigned rank (`i`); -1 = absent.
    pub sync_index: i32,
    /// Sender address byte (`r`); -1 = absent.
    pub sender: i32,
    /// Status/battery bitmask (`y`); -1 = absent.
    pub battery: i32,
}

impl Default for ControlEvent {
    fn default() -> Self {
        Self {
            time: -1,
            client: -1,
            osc: -1,
            wave: UNSET,
            freq: UNSET,
            trigger: UNSET,
            amp: UNSET,
            duty: UNSET,
            feedback: UNSET,
            adsr: [UNSET; 4],
            adsr_targets: UNSET,
            filter_freq: UNSET,
            filter_kind: UNSET,
            resonance: UNSET,
            mod_source: UNSET,
            mod_targets: UNSET,
            algorithm: UNSET,
            algo_sources: [UNSET; 6],
            patch: UNSET,
            phase: UNSET,
            master_volume: UNSET,
            eq_low: UNSET,
            eq_mid: UNSET,
            eq_high: UNSET,
            note: UNSET,
            ratio: UNSET,
            reset: UNSET,
            debug: UNSET,
            sync_time: -1,
            sync_index: -1,
            sender: -1,
            battery: -1,
        }
    }
}

/// Maximum deltas one message can decompose into (every field set).
pub const MAX_DELTAS: usize = 40;

impl ControlEvent {
    /// Whether the message carries sync data (`r` and `s` both present).
    pub fn is_sync_bearing(&self) -> bool {
        self.sender >= 0 && self.sync_time >= 0
    }

    /// Decompose into deltas at local play time `time` (ms).
    ///
    /// Only set fields emit. Resets come first so a combined
    /// reset-and-configure message applies in a usable order; the trigger
    /// comes last so the voice state is complete before it gates on.
    pub fn deltas(&self, time: u64) -> ArrayVec<Delta, MAX_DELTAS> {
        let osc = if self.osc >= 0 { self.osc as u8 } else { 0 };
        let mut out = ArrayVec::new();
        let mut push = |tag: ParamTag, value: f32| {
            out.push(Delta::new(time, osc, tag, value));
        };

        if self.reset >= 0.0 {
            push(ParamTag::Reset, self.reset);
        }
        if self.wave >= 0.0 {
            push(ParamTag::Wave, self.wave);
        }
        if self.freq >= 0.0 {
            push(ParamTag::Freq, self.freq);
        }
        if self.note >= 0.0 {
            push(ParamTag::Note, self.note);
        }
        if self.ratio >= 0.0 {
            push(ParamTag::FreqRatio, self.ratio);
        }
        if self.amp >= 0.0 {
            push(ParamTag::Amp, self.amp);
        }
        if self.duty >= 0.0 {
            push(ParamTag::Duty, self.duty);
        }
        if self.feedback >= 0.0 {
            push(ParamTag::Feedback, self.feedback);
        }
        let adsr_tags = [
            ParamTag::AdsrAttack,
            ParamTag::AdsrDecay,
            ParamTag::AdsrSustain,
            ParamTag::AdsrRelease,
        ];
        for (tag, &v) in adsr_tags.iter().zip(&self.adsr) {
            if v >= 0.0 {
                push(*tag, v);
            }
        }
        if self.adsr_targets >= 0.0 {
            push(ParamTag::AdsrTargets, self.adsr_targets);
        }
        if self.filter_freq >= 0.0 {
            push(ParamTag::FilterFreq, self.filter_freq);
        }
        if self.filter_kind >= 0.0 {
            push(ParamTag::FilterKind, self.filter_kind);
        }
        if self.resonance >= 0.0 {
            push(ParamTag::Resonance, self.resonance);
        }
        if self.mod_source >= 0.0 {
            push(ParamTag::ModSource, self.mod_source);
        }
        if self.mod_targets >= 0.0 {
            push(ParamTag::ModTargets, self.mod_targets);
        }
        if self.algorithm >= 0.0 {
            push(ParamTag::Algorithm, self.algorithm);
        }
        for (slot, &v) in self.algo_sources.iter().enumerate() {
            if v >= 0.0 {
                push(ParamTag::AlgoSource(slot as u8), v);
            }
        }
        if self.patch >= 0.0 {
            push(ParamTag::Patch, self.patch);
        }
        if self.phase >= 0.0 {
            push(ParamTag::Phase, self.phase);
        }
        if self.master_volume >= 0.0 {
            push(ParamTag::MasterVolume, self.master_volume);
        }
        if self.eq_low >= 0.0 {
            push(ParamTag::EqLow, self.eq_low);
        }
        if self.eq_mid >= 0.0 {
            push(ParamTag::EqMid, self.eq_mid);
        }
        if self.eq_high >= 0.0 {
            push(ParamTag::EqHigh, self.eq_high);
        }
        if self.debug >= 0.0 {
            push(ParamTag::Debug, self.debug);
        }
        if self.trigger >= 0.0 {
            push(ParamTag::Trigger, self.trigger);
        }
        out
    }
}
