//! Phase accumulators and the phase-distortion transforms applied to them.
//!
//! A phase is a wrapping `u32`; its top 8 bits index a 257-entry waveform and
//! the next 16 bits interpolate (see [crate::fixedmath::interpolate824]).
//! Pitch is turned into a per-sample increment by [compute_phase_increment].

use crate::context::Context;
use crate::fixedmath::{interpolate824, mix_u32, IScalar};
use crate::tables::Waveform;
use crate::{Pitch, MAX_PARAM};

const HIGHEST_NOTE: i32 = 140 * 128;
const TABLE_START: i32 = 128 * 128;
const OCTAVE: i32 = 12 * 128;

/// Convert a pitch to a phase increment.
///
/// The increment table covers the top octave (MIDI notes 128 to 140) in
/// steps of 16 pitch units; lower pitches are folded up into that octave and
/// the result is halved once per octave.  Pitches at or above note 140 are
/// clamped just below it, and pitches more than 32 octaves down yield zero.
pub fn compute_phase_increment(context: &Context, pitch: Pitch) -> u32 {
    let pitch = (pitch.to_bits() as i32).min(HIGHEST_NOTE - 1);
    let mut ref_pitch = pitch - TABLE_START;
    let mut num_shifts = 0u32;
    if ref_pitch < 0 {
        num_shifts = ((OCTAVE - 1 - ref_pitch) / OCTAVE) as u32;
        ref_pitch += num_shifts as i32 * OCTAVE;
    }
    let table = &context.tables().oscillator_increments;
    let idx = (ref_pitch >> 4) as usize;
    let a = table[idx];
    let b = table[idx + 1];
    let increment = a.wrapping_add((((b.wrapping_sub(a)) as i32 * (ref_pitch & 0xf)) >> 4) as u32);
    increment.checked_shr(num_shifts).unwrap_or(0)
}

/// A phase accumulator whose increment ramps linearly toward its target,
/// giving portamento between pitches.
///
/// The ramp lasts `mix_u32(1, max_glide, glide)` samples: zero glide jumps
/// immediately and [MAX_PARAM] glide takes the full maximum duration.
#[derive(Clone)]
pub struct PitchGlide {
    phase: u32,
    increment: u32,
    target: u32,
    delta: u32,
    glide: i16,
    max_glide_ms: u32,
}

impl Default for PitchGlide {
    fn default() -> Self {
        Self {
            phase: 0,
            increment: 0,
            target: 0,
            delta: 0,
            glide: 0,
            max_glide_ms: 1000,
        }
    }
}

impl PitchGlide {
    /// Set the glide amount (negative values are treated as zero)
    pub fn set_glide(&mut self, glide: i16) {
        self.glide = glide.max(0);
    }
    /// Set the duration of a glide at the maximum glide amount
    pub fn set_max_glide_duration(&mut self, milliseconds: u32) {
        self.max_glide_ms = milliseconds;
    }
    /// Set a new target pitch, starting a glide from the current increment
    pub fn set_pitch(&mut self, context: &Context, pitch: Pitch) {
        self.target = compute_phase_increment(context, pitch);
        if self.glide == 0 || self.increment == 0 {
            self.increment = self.target;
            self.delta = 0;
        } else {
            let max_glide = (context.sample_rate() as u64 * self.max_glide_ms as u64 / 1000)
                .min(u32::MAX as u64) as u32;
            let duration = mix_u32(1, max_glide, IScalar::from_bits(self.glide)).max(1);
            self.delta = (self.increment.abs_diff(self.target) / duration).max(1);
        }
    }
    /// True while the increment is still moving toward its target
    pub fn gliding(&self) -> bool {
        self.increment != self.target
    }
    /// Fill `out` with successive phases
    pub fn render(&mut self, out: &mut [u32]) {
        for p in out.iter_mut() {
            if self.increment < self.target {
                self.increment = self.increment.saturating_add(self.delta).min(self.target);
            } else if self.increment > self.target {
                self.increment = self.increment.saturating_sub(self.delta).max(self.target);
            }
            self.phase = self.phase.wrapping_add(self.increment);
            *p = self.phase;
        }
    }
}

/// A phase accumulator for percussive "punch": each strike starts the
/// increment above its target and ramps it down at a constant rate.
#[derive(Default, Clone)]
pub struct PitchDecay {
    phase: u32,
    increment: u32,
    target: u32,
    delta: u32,
    punch: i16,
    punch_decay: i16,
}

impl PitchDecay {
    /// How far above the target the increment starts: zero starts at the
    /// target, [MAX_PARAM] starts five octaves up
    pub fn set_punch(&mut self, punch: i16) {
        self.punch = punch.max(0);
    }
    /// How long the ramp down takes: larger values decay more slowly
    pub fn set_punch_decay(&mut self, punch_decay: i16) {
        self.punch_decay = punch_decay.max(0);
    }
    /// Start a new strike at `pitch`
    pub fn on(&mut self, context: &Context, pitch: Pitch) {
        self.phase = 0;
        self.target = compute_phase_increment(context, pitch);
        let offset = compute_phase_increment(
            context,
            pitch.saturating_add(Pitch::from_bits(12 * 128 * 5)),
        );
        self.increment = mix_u32(self.target, offset, IScalar::from_bits(self.punch));
        let param = (MAX_PARAM - self.punch_decay) as u32;
        let steps = context.sample_rate() / (1 + param / 256);
        self.delta = (self.increment.saturating_sub(self.target) / steps).max(1);
    }
    /// Fill `out` with successive phases
    pub fn render(&mut self, out: &mut [u32]) {
        for p in out.iter_mut() {
            if self.increment > self.target {
                self.increment = self.increment.saturating_sub(self.delta).max(self.target);
            }
            self.phase = self.phase.wrapping_add(self.increment);
            *p = self.phase;
        }
    }
}

/// Transforms that warp a buffer of phases before waveform lookup
pub mod distortion {
    use super::*;

    const HALF: u32 = u32::MAX / 2;

    /// Remap each phase through `table` (read as a signed phase, -32768 is the
    /// start of the cycle and 32767 its end) and blend the remapped phase in
    /// by `amount`.
    pub fn lookup(phase: &mut [u32], table: &Waveform, amount: &[i16]) {
        for (p, amt) in phase.iter_mut().zip(amount.iter()) {
            let warped = interpolate824(table, *p) as i32 + 32768;
            let new_phase = ((warped as u32) << 16).wrapping_sub(1);
            *p = mix_u32(*p, new_phase, IScalar::from_bits(*amt));
        }
    }

    // Speed up the second half of the cycle by a factor set by `amount`.  The
    // 64 bit product wraps by design of the transform.
    fn stretch(phase: u32, amount: i16) -> u64 {
        let multiplier = u64::MAX.wrapping_add((amount as i64 as u64) << 22);
        ((phase - HALF) as u64).wrapping_mul(multiplier) >> 32
    }

    // Linear fade from full scale at mid-cycle to nothing at the end
    fn fade(phase: u32) -> IScalar {
        IScalar::from_bits(((u32::MAX - phase) >> 16).wrapping_sub(1) as i16)
    }

    /// Resonant phase distortion: the second half of each cycle replays the
    /// whole waveform at a higher rate, faded out toward the cycle's end.
    /// `attenuation` receives the fade to apply after lookup.
    pub fn resonant_full(phase: &mut [u32], amount: &[i16], attenuation: &mut [IScalar]) {
        for ((p, amt), att) in phase.iter_mut().zip(amount.iter()).zip(attenuation.iter_mut()) {
            if *p < HALF {
                *att = IScalar::MAX;
            } else {
                let phase_in = *p;
                *p = (stretch(phase_in, *amt) % u32::MAX as u64) as u32;
                *att = fade(phase_in);
            }
        }
    }

    /// Like [resonant_full], but the second half of the cycle replays only
    /// the second half of the waveform.
    pub fn resonant_second_half(
        phase: &mut [u32],
        amount: &[i16],
        attenuation: &mut [IScalar],
    ) {
        for ((p, amt), att) in phase.iter_mut().zip(amount.iter()).zip(attenuation.iter_mut()) {
            if *p < HALF {
                *att = IScalar::MAX;
            } else {
                let phase_in = *p;
                *p = HALF + (stretch(phase_in, *amt) % HALF as u64) as u32;
                *att = fade(phase_in);
            }
        }
    }
}
