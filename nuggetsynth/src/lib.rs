//! This crate contains the synthesis core for a small dual-core audio gadget.
//! It is `no_std` and performs all audio processing in fixed point, using
//! the `fixed` crate's saturating and widening operations so that every
//! target produces bit-identical output.
//!
//! The crate is organized leaves-first:
//!
//!  - [fixedmath] and [tables] hold the interpolation/mixing primitives and the
//!    compile-time generated lookup tables they read from.
//!  - [devices] builds oscillators, envelopes, filters and waveshapers on top
//!    of those primitives.
//!  - [midi] decodes a raw MIDI byte stream.
//!  - [transport] moves audio buffers and MIDI events between the two cores.
//!  - [engine] owns all voices/channels and renders/mixes output buffers.
//!  - [dispatch] contains the two long-running core loops.
//!
//! Enabling the `std` feature adds a host-side loopback [transport::Fifo]
//! useful for running both cores as threads.

#![no_std]
#![warn(missing_docs)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod context;
pub mod devices;
pub mod dispatch;
pub mod engine;
mod error;
pub mod fixedmath;
pub mod midi;
pub mod tables;
pub mod transport;

pub use error::Error;
pub use fixedmath::{IScalar, Sample, Scalar};

/// A pitch, in MIDI note numbers with 7 fractional bits (1/128th of a
/// semitone).  A value of 69.0 is A440.  The raw bits of this type are the
/// "pitch units" used throughout the DSP code.
pub type Pitch = fixed::types::I9F7;

/// The number of frames rendered per voice in one pass of the engine
pub const BLOCK_SIZE: usize = 32;

/// The maximum value of a 15-bit parameter (timbre, color, amounts, ...)
pub const MAX_PARAM: i16 = i16::MAX;

/// The largest number of voices an [engine::Engine] may be configured with
pub const MAX_VOICES: usize = 8;

/// The largest number of channels an [engine::Engine] may be configured with
pub const MAX_CHANNELS: usize = 4;
