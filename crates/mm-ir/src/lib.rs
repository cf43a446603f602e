//! Core data model for the murmur synthesis engine.
//!
//! This crate defines the types shared between the render engine and the
//! network layer: scheduled parameter deltas, the per-voice oscillator
//! record, envelope parameters, FM patches, and the wire-level control
//! event. The engine consumes these, the parser produces them.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod adsr;
mod clock;
mod delta;
mod event;
mod frame;
mod oscillator;
mod patch;
mod tuning;
mod wavetable;

pub use adsr::{AdsrParams, AdsrPhase, adsr_scale};
pub use clock::Sysclock;
pub use delta::{Delta, ParamTag, TIME_FENCE, TIME_FREE};
pub use event::{ControlEvent, UNSET};
pub use frame::{Block, Frame, BLOCK_SIZE};
pub use oscillator::{
    target, FilterKind, OscState, OscStatus, Waveform, OSC_COUNT,
};
pub use patch::{OpPatch, Patch, patch, PATCHES};
pub use tuning::note_to_freq;
pub use wavetable::{Wavetable, WavetableBank, WaveKey};

/// Output sample rate, Hz. All time math derives from this.
pub const SAMPLE_RATE: u32 = 44_100;

/// Fixed capacity of the delta queue arena.
pub const QUEUE_CAP: usize = 256;
