//! This module contains definitions of several different DSP primitives.
//!
//! Everything here renders into caller-provided [Sample] buffers, one block at a
//! time, and holds only its own (small, fixed-size) state.  The oscillators
//! share a common [Oscillator] interface so that a [MacroOscillator] can
//! switch between them by [Shape] without any allocation.

mod env;
mod filt;
mod kick;
mod macro_osc;
mod osc;
pub mod phase;
mod waveshaper;

use crate::context::Context;
use crate::{Pitch, Sample};

pub use env::{EnvelopeSegment, SegmentCurve, SegmentTime, AR};
pub use filt::{FilteredOscillator, SvfMode, SVF};
pub use kick::WaveformKick;
pub use macro_osc::{MacroOscillator, Shape};
pub use osc::{
    PhaseDistortionLookupOscillator, PhaseDistortionResonantOscillator, ResonanceMode,
    WaveformOscillator,
};
pub use waveshaper::SignatureWaveshaper;

/// The interface shared by every oscillator a [MacroOscillator] can select.
///
/// `timbre` and `color` are 15-bit parameters (0 to [crate::MAX_PARAM]) whose
/// meaning depends on the oscillator.
pub trait Oscillator {
    /// Restart the oscillator for a new note.  Most oscillators are free
    /// running and ignore this.
    fn strike(&mut self, _context: &Context) {}
    /// Set the portamento amount, for oscillators that support it
    fn set_glide(&mut self, _glide: i16) {}
    /// Set the length of a glide at the maximum glide amount
    fn set_max_glide_duration(&mut self, _milliseconds: u32) {}
    /// Render `out.len()` samples at `pitch`
    fn render(
        &mut self,
        context: &Context,
        pitch: Pitch,
        timbre: i16,
        color: i16,
        out: &mut [Sample],
    );
}
