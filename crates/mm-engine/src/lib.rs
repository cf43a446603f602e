//! Block render engine for murmur.
//!
//! Drains the delta queue once per block, mutates the oscillator bank,
//! derives the modulated snapshot, and renders through the waveform and
//! FM-algorithm dispatch into soft-clipped 16-bit frames.

pub mod algorithm;
mod bank;
mod filter;
mod mixer;
mod modulate;
mod queue;
mod waveforms;

pub use bank::{resolve_in_half, Bank, Globals, HALF};
pub use filter::{FilterState, ThreeBandEq};
pub use mixer::{Engine, SoftClip};
pub use modulate::{AlgoSnapshot, OpSnapshot, Snapshot};
pub use queue::DeltaQueue;
