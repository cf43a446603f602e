//! Scheduled parameter changes.

/// Sentinel time marking a free arena slot.
pub const TIME_FREE: u64 = u64::MAX;

/// Time of the permanent fencepost entry terminating the sorted list.
pub const TIME_FENCE: u64 = u64::MAX - 1;

/// One timestamped parameter change targeting a single oscillator.
///
/// Deltas are produced by the message parser and consumed by the
/// per-block drain. `value` carries the raw parsed number; interpretation
/// is up to the bank's `apply` for the given tag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Delta {
    /// Local sysclock time (ms) at which the change becomes due.
    pub time: u64,
    /// Target oscillator index (wrapped modulo the bank size on apply).
    pub osc: u8,
    /// Which parameter changes.
    pub tag: ParamTag,
    /// Raw value.
    pub value: f32,
}

impl Delta {
    /// Create a new delta.
    pub fn new(time: u64, osc: u8, tag: ParamTag, value: f32) -> Self {
        Self { time, osc, tag, value }
    }
}

/// Every schedulable parameter, as a closed tag.
///
/// Dispatch over this is always a flat `match`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamTag {
    Wave,
    Freq,
    /// Note trigger: value >= 0.5 arms the on-clock, < 0.5 the off-clock.
    Trigger,
    Amp,
    Duty,
    Feedback,
    AdsrAttack,
    AdsrDecay,
    AdsrSustain,
    AdsrRelease,
    AdsrTargets,
    FilterFreq,
    FilterKind,
    Resonance,
    ModSource,
    ModTargets,
    Algorithm,
    /// One operator slot (0-5) of an algorithm voice's source list.
    AlgoSource(u8),
    Patch,
    Phase,
    /// MIDI note number, converted to frequency on apply.
    Note,
    /// Frequency ratio multiplied onto the current frequency.
    FreqRatio,
    MasterVolume,
    EqLow,
    EqMid,
    EqHigh,
    /// Value 0 resets the addressed oscillator, >= 1 the whole bank.
    Reset,
    /// Diagnostic dump request (level in value).
    Debug,
}
