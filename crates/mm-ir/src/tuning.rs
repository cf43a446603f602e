//! MIDI note to frequency conversion (12-TET, A4 = 440 Hz).

use libm::powf;

/// Convert a MIDI note number to a frequency in Hz.
///
/// Fractional notes are honored so detuned streams stay usable.
pub fn note_to_freq(note: f32) -> f32 {
    440.0 * powf(2.0, (note - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert!((note_to_freq(69.0) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn octave_doubles() {
        assert!((note_to_freq(81.0) - 880.0).abs() < 1e-2);
        assert!((note_to_freq(57.0) - 220.0).abs() < 1e-2);
    }

    #[test]
    fn middle_c() {
        assert!((note_to_freq(60.0) - 261.63).abs() < 0.05);
    }
}
