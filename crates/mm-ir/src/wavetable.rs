//! Single-cycle wavetables for the sample renderer.
//!
//! Asset loading from disk is an external collaborator; the bank ships a
//! couple of generated tables so `Waveform::Sample` is always playable.

use alloc::vec::Vec;
use arrayvec::ArrayString;
use core::f32::consts::TAU;
use libm::sinf;

slotmap::new_key_type! {
    /// Key for referencing tables in the bank.
    pub struct WaveKey;
}

/// Default generated table length in samples.
const TABLE_LEN: usize = 1024;

/// One single-cycle wavetable.
#[derive(Clone, Debug)]
pub struct Wavetable {
    pub name: ArrayString<22>,
    /// One cycle of samples in [-1, 1].
    pub data: Vec<f32>,
}

impl Wavetable {
    pub fn new(name: &str, data: Vec<f32>) -> Self {
        let mut table = Self { name: ArrayString::new(), data };
        let _ = table.name.try_push_str(name);
        table
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linearly interpolated read at integer index `step` + 16-bit fraction.
    pub fn at(&self, step: u32, sub_step: u16) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let i = step as usize % self.data.len();
        let j = (i + 1) % self.data.len();
        let frac = sub_step as f32 / 65536.0;
        self.data[i] + (self.data[j] - self.data[i]) * frac
    }
}

/// Ordered bank of wavetables.
///
/// The slotmap owns the data; the order list gives the wire protocol its
/// stable small-integer indices.
#[derive(Default)]
pub struct WavetableBank {
    tables: slotmap::SlotMap<WaveKey, Wavetable>,
    order: Vec<WaveKey>,
}

impl WavetableBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bank every unit starts with.
    pub fn builtin() -> Self {
        let mut bank = Self::new();
        bank.insert(Wavetable::new("organ", additive(&[1.0, 0.5, 0.25, 0.125])));
        bank.insert(Wavetable::new("hollow", additive(&[1.0, 0.0, 0.33, 0.0, 0.2])));
        bank
    }

    pub fn insert(&mut self, table: Wavetable) -> WaveKey {
        let key = self.tables.insert(table);
        self.order.push(key);
        key
    }

    pub fn get(&self, key: WaveKey) -> Option<&Wavetable> {
        self.tables.get(key)
    }

    /// Look up by wire index, wrapping modulo the bank size.
    pub fn by_index(&self, index: u8) -> Option<&Wavetable> {
        if self.order.is_empty() {
            return None;
        }
        let key = self.order[index as usize % self.order.len()];
        self.tables.get(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Sum sine harmonics with the given amplitudes, normalized to [-1, 1].
fn additive(harmonics: &[f32]) -> Vec<f32> {
    let mut data = Vec::with_capacity(TABLE_LEN);
    let mut peak = 0.0f32;
    for n in 0..TABLE_LEN {
        let t = n as f32 / TABLE_LEN as f32;
        let mut s = 0.0;
        for (h, &a) in harmonics.iter().enumerate() {
            s += a * sinf(TAU * (h as f32 + 1.0) * t);
        }
        peak = peak.max(s.abs());
        data.push(s);
    }
    if peak > 0.0 {
        for s in &mut data {
            *s /= peak;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bank_has_tables() {
        let bank = WavetableBank::builtin();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.by_index(0).unwrap().name.as_str(), "organ");
        // index wraps
        assert_eq!(bank.by_index(2).unwrap().name.as_str(), "organ");
    }

    #[test]
    fn tables_are_normalized() {
        let bank = WavetableBank::builtin();
        for i in 0..bank.len() as u8 {
            let t = bank.by_index(i).unwrap();
            let peak = t.data.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!((peak - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn interpolated_read_wraps() {
        let table = Wavetable::new("ramp", alloc::vec![0.0, 1.0]);
        assert_eq!(table.at(0, 0), 0.0);
        assert_eq!(table.at(1, 0), 1.0);
        // halfway between last sample and wrap-around to first
        assert!((table.at(1, 32768) - 0.5).abs() < 1e-3);
        // step wraps modulo len
        assert_eq!(table.at(2, 0), 0.0);
    }
}
