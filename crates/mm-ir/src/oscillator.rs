//! The per-voice oscillator record and its closed tag enums.

use crate::adsr::AdsrParams;

/// Number of oscillators in the bank. The render pipeline statically
/// bisects this range into two worker halves.
pub const OSC_COUNT: usize = 16;

/// Waveform renderer selection. Wire values 0-7 map in declaration order;
/// values >= 8 select the wavetable renderer with table index `w - 8`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Sine,
    Pulse,
    Saw,
    Triangle,
    Noise,
    /// Karplus-Strong plucked string.
    Pluck,
    /// Single-cycle wavetable playback.
    Sample,
    /// FM operator-routing graph voice.
    Algorithm,
}

impl Waveform {
    /// Decode a wire value. Out-of-range analytic values fall back to sine;
    /// values >= 8 select `Sample` (the caller keeps the table index).
    pub fn from_wire(v: i32) -> Self {
        match v {
            1 => Waveform::Pulse,
            2 => Waveform::Saw,
            3 => Waveform::Triangle,
            4 => Waveform::Noise,
            5 => Waveform::Pluck,
            6 => Waveform::Sample,
            7 => Waveform::Algorithm,
            v if v >= 8 => Waveform::Sample,
            _ => Waveform::Sine,
        }
    }
}

/// Voice lifecycle state.
///
/// `Off -> Scheduled -> Audible -> Off`, with two side states marking a
/// voice that renders only as an input to another voice and is never
/// mixed to the output directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OscStatus {
    #[default]
    Off,
    /// Triggered with an on-clock still in the future.
    Scheduled,
    /// Rendering and mixed to output.
    Audible,
    /// Rendered headlessly as another voice's modulation source.
    ModSource,
    /// Rendered as an operator of an algorithm voice.
    AlgoSource,
}

/// Per-voice filter selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterKind {
    #[default]
    None,
    LowPass,
    HighPass,
    BandPass,
}

impl FilterKind {
    /// Decode a wire value; unknown values disable the filter.
    pub fn from_wire(v: i32) -> Self {
        match v {
            1 => FilterKind::LowPass,
            2 => FilterKind::HighPass,
            3 => FilterKind::BandPass,
            _ => FilterKind::None,
        }
    }
}

/// Bitmask targets for envelope and modulation scaling.
pub mod target {
    pub const AMP: u8 = 1 << 0;
    pub const DUTY: u8 = 1 << 1;
    pub const FREQ: u8 = 1 << 2;
    pub const FILTER_FREQ: u8 = 1 << 3;
    pub const RESONANCE: u8 = 1 << 4;
}

/// The single source of truth for one voice.
///
/// Mutated by delta application, read by the render pipeline. Never
/// destroyed; `reset` returns it to defaults.
#[derive(Clone, Copy, Debug)]
pub struct OscState {
    pub wave: Waveform,
    /// Base frequency, Hz.
    pub freq: f32,
    /// Amplitude 0-1.
    pub amp: f32,
    /// Pulse duty cycle 0-1.
    pub duty: f32,
    /// Feedback coefficient (string damping, FM operator feedback).
    pub feedback: f32,

    /// Sysclock ms the envelope was gated on; 0 = unarmed.
    pub on_clock: u64,
    /// Sysclock ms the envelope was gated off; 0 = unarmed.
    pub off_clock: u64,
    pub adsr: AdsrParams,
    /// Bitmask of `target::*` the envelope scales; 0 means amplitude only.
    pub adsr_targets: u8,

    /// Index of the voice rendered headlessly as this voice's mod source.
    pub mod_source: Option<u8>,
    /// Bitmask of `target::*` the mod scale applies to.
    pub mod_targets: u8,

    /// Algorithm table entry for `Waveform::Algorithm` voices.
    pub algorithm: u8,
    /// Operator source oscillators, slot 0-5.
    pub algo_sources: [Option<u8>; 6],

    pub filter: FilterKind,
    /// Filter cutoff, Hz.
    pub filter_freq: f32,
    /// Filter resonance 0-1.
    pub resonance: f32,

    /// Normalized play-head phase (0-1) for analytic waveforms.
    pub phase: f32,
    /// Integer play-head for wavetable playback.
    pub step: u32,
    /// 16-bit fractional part of `step`.
    pub sub_step: u16,
    /// Wavetable index for `Waveform::Sample`.
    pub table: u8,
    /// Frequency ratio; multiplies `freq` at render time (FM operators).
    pub ratio: f32,
    /// Set by a trigger so the string renderer re-excites its delay line.
    pub pluck_pending: bool,

    pub status: OscStatus,
}

impl Default for OscState {
    fn default() -> Self {
        Self {
            wave: Waveform::Sine,
            freq: 440.0,
            amp: 1.0,
            duty: 0.5,
            feedback: 0.0,
            on_clock: 0,
            off_clock: 0,
            adsr: AdsrParams::default(),
            adsr_targets: target::AMP,
            mod_source: None,
            mod_targets: target::AMP,
            algorithm: 0,
            algo_sources: [None; 6],
            filter: FilterKind::None,
            filter_freq: 1000.0,
            resonance: 0.0,
            phase: 0.0,
            step: 0,
            sub_step: 0,
            table: 0,
            ratio: 1.0,
            pluck_pending: false,
            status: OscStatus::Off,
        }
    }
}

impl OscState {
    /// Return the record to power-on defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the render pipeline should produce samples for this voice.
    pub fn is_sounding(&self) -> bool {
        matches!(self.status, OscStatus::Scheduled | OscStatus::Audible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_waveform_mapping() {
        assert_eq!(Waveform::from_wire(0), Waveform::Sine);
        assert_eq!(Waveform::from_wire(5), Waveform::Pluck);
        assert_eq!(Waveform::from_wire(7), Waveform::Algorithm);
        // table-select values collapse to Sample
        assert_eq!(Waveform::from_wire(9), Waveform::Sample);
        // negative is permissive
        assert_eq!(Waveform::from_wire(-3), Waveform::Sine);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut osc = OscState::default();
        osc.freq = 880.0;
        osc.status = OscStatus::Audible;
        osc.algo_sources[2] = Some(5);
        osc.reset();
        assert_eq!(osc.freq, 440.0);
        assert_eq!(osc.status, OscStatus::Off);
        assert_eq!(osc.algo_sources, [None; 6]);
    }
}
