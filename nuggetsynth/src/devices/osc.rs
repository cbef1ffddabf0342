use super::phase::{distortion, PitchGlide};
use super::Oscillator;
use crate::context::Context;
use crate::fixedmath::{crossfade, interpolate824_buf, modulate, IScalar, Sample, Scalar};
use crate::tables::{Waveform, PHASE_WARP_1, PHASE_WARP_2, PHASE_WARP_3, SINE};
use crate::{Pitch, BLOCK_SIZE};

// A glide generator that only restarts its ramp when the pitch changes
#[derive(Clone, Default)]
struct PhaseSource {
    gen: PitchGlide,
    pitch: Option<Pitch>,
}

impl PhaseSource {
    fn set_glide(&mut self, glide: i16) {
        self.gen.set_glide(glide);
    }
    fn set_max_glide_duration(&mut self, milliseconds: u32) {
        self.gen.set_max_glide_duration(milliseconds);
    }
    fn render(&mut self, context: &Context, pitch: Pitch, out: &mut [u32]) {
        if self.pitch != Some(pitch) {
            self.gen.set_pitch(context, pitch);
            self.pitch = Some(pitch);
        }
        self.gen.render(out);
    }
}

/// A table-lookup oscillator that crossfades between two waveforms.
///
/// Timbre sets the balance: 0 plays only the first waveform and
/// [crate::MAX_PARAM] (almost) only the second.  Color is unused.
#[derive(Clone)]
pub struct WaveformOscillator {
    phase: PhaseSource,
    wave_a: &'static Waveform,
    wave_b: &'static Waveform,
}

impl WaveformOscillator {
    /// Constructor
    pub fn new(wave_a: &'static Waveform, wave_b: &'static Waveform) -> Self {
        Self {
            phase: PhaseSource::default(),
            wave_a,
            wave_b,
        }
    }
}

impl Default for WaveformOscillator {
    fn default() -> Self {
        Self::new(&SINE, &SINE)
    }
}

impl Oscillator for WaveformOscillator {
    fn set_glide(&mut self, glide: i16) {
        self.phase.set_glide(glide);
    }
    fn set_max_glide_duration(&mut self, milliseconds: u32) {
        self.phase.set_max_glide_duration(milliseconds);
    }
    fn render(
        &mut self,
        context: &Context,
        pitch: Pitch,
        timbre: i16,
        _color: i16,
        out: &mut [Sample],
    ) {
        let balance = Scalar::from_bits((timbre.max(0) as u16) << 1);
        let mut phase = [0u32; BLOCK_SIZE];
        for chunk in out.chunks_mut(BLOCK_SIZE) {
            let phase = &mut phase[..chunk.len()];
            self.phase.render(context, pitch, phase);
            for (s, p) in chunk.iter_mut().zip(phase.iter()) {
                *s = crossfade(self.wave_a, self.wave_b, *p, balance);
            }
        }
    }
}

/// Phase distortion by table lookup: each phase is remapped through a warp
/// curve before reading the waveform.
///
/// Timbre is the distortion amount.  Color picks one of three progressively
/// stronger warp curves.
#[derive(Clone)]
pub struct PhaseDistortionLookupOscillator {
    phase: PhaseSource,
    waveform: &'static Waveform,
}

impl PhaseDistortionLookupOscillator {
    /// Constructor
    pub fn new(waveform: &'static Waveform) -> Self {
        Self {
            phase: PhaseSource::default(),
            waveform,
        }
    }
    fn warp(color: i16) -> &'static Waveform {
        match (color.max(0) as i32 * 3) >> 15 {
            0 => &PHASE_WARP_1,
            1 => &PHASE_WARP_2,
            _ => &PHASE_WARP_3,
        }
    }
}

impl Default for PhaseDistortionLookupOscillator {
    fn default() -> Self {
        Self::new(&SINE)
    }
}

impl Oscillator for PhaseDistortionLookupOscillator {
    fn set_glide(&mut self, glide: i16) {
        self.phase.set_glide(glide);
    }
    fn set_max_glide_duration(&mut self, milliseconds: u32) {
        self.phase.set_max_glide_duration(milliseconds);
    }
    fn render(
        &mut self,
        context: &Context,
        pitch: Pitch,
        timbre: i16,
        color: i16,
        out: &mut [Sample],
    ) {
        let warp = Self::warp(color);
        let amount = [timbre; BLOCK_SIZE];
        let mut phase = [0u32; BLOCK_SIZE];
        for chunk in out.chunks_mut(BLOCK_SIZE) {
            let phase = &mut phase[..chunk.len()];
            self.phase.render(context, pitch, phase);
            distortion::lookup(phase, warp, &amount);
            interpolate824_buf(self.waveform, phase, chunk);
        }
    }
}

/// Which part of the waveform a [PhaseDistortionResonantOscillator] replays
/// during the second half of each cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResonanceMode {
    /// Replay the whole waveform
    Full,
    /// Replay only the second half of the waveform
    SecondHalf,
}

/// Resonant phase distortion: the second half of each cycle is replaced by a
/// faster, fading copy of the waveform, like a resonant filter ringing.
///
/// Timbre sets how much faster the copy runs.  Color is unused.
#[derive(Clone)]
pub struct PhaseDistortionResonantOscillator {
    phase: PhaseSource,
    waveform: &'static Waveform,
    mode: ResonanceMode,
}

impl PhaseDistortionResonantOscillator {
    /// Constructor
    pub fn new(waveform: &'static Waveform, mode: ResonanceMode) -> Self {
        Self {
            phase: PhaseSource::default(),
            waveform,
            mode,
        }
    }
}

impl Oscillator for PhaseDistortionResonantOscillator {
    fn set_glide(&mut self, glide: i16) {
        self.phase.set_glide(glide);
    }
    fn set_max_glide_duration(&mut self, milliseconds: u32) {
        self.phase.set_max_glide_duration(milliseconds);
    }
    fn render(
        &mut self,
        context: &Context,
        pitch: Pitch,
        timbre: i16,
        _color: i16,
        out: &mut [Sample],
    ) {
        let amount = [timbre; BLOCK_SIZE];
        let mut phase = [0u32; BLOCK_SIZE];
        let mut attenuation = [IScalar::ZERO; BLOCK_SIZE];
        for chunk in out.chunks_mut(BLOCK_SIZE) {
            let len = chunk.len();
            let phase = &mut phase[..len];
            let attenuation = &mut attenuation[..len];
            self.phase.render(context, pitch, phase);
            match self.mode {
                ResonanceMode::Full => distortion::resonant_full(phase, &amount, attenuation),
                ResonanceMode::SecondHalf => {
                    distortion::resonant_second_half(phase, &amount, attenuation)
                }
            }
            interpolate824_buf(self.waveform, phase, chunk);
            modulate(chunk, attenuation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixedmath::{interpolate824, key_to_pitch};
    use crate::tables::{SAWTOOTH, SQUARE_SIN, TRIANGLE};
    use crate::MAX_PARAM;

    const CTX: Context = Context::new_480();

    fn peak(buf: &[Sample]) -> i16 {
        buf.iter().map(|s| s.to_bits().saturating_abs()).max().unwrap_or(0)
    }

    #[test]
    fn waveform_follows_table() {
        let mut osc = WaveformOscillator::new(&SINE, &SAWTOOTH);
        let mut out = [Sample::ZERO; 64];
        osc.render(&CTX, key_to_pitch(60), 0, 0, &mut out);
        let inc = crate::devices::phase::compute_phase_increment(&CTX, key_to_pitch(60));
        for (i, s) in out.iter().enumerate() {
            let phase = inc.wrapping_mul(i as u32 + 1);
            assert_eq!(s.to_bits(), interpolate824(&SINE, phase));
        }
    }
    #[test]
    fn waveform_crossfades_by_timbre() {
        let pitch = key_to_pitch(69);
        let mut sine = WaveformOscillator::new(&SINE, &TRIANGLE);
        let mut tri = WaveformOscillator::new(&SINE, &TRIANGLE);
        let mut a = [Sample::ZERO; BLOCK_SIZE];
        let mut b = [Sample::ZERO; BLOCK_SIZE];
        sine.render(&CTX, pitch, 0, 0, &mut a);
        tri.render(&CTX, pitch, MAX_PARAM, 0, &mut b);
        assert_ne!(a, b);
        // a triangle rises linearly at the start of the cycle
        assert!(b[0] < a[0]);
    }
    #[test]
    fn lookup_distortion_changes_shape() {
        let pitch = key_to_pitch(40);
        let mut clean = PhaseDistortionLookupOscillator::default();
        let mut warped = PhaseDistortionLookupOscillator::default();
        let mut a = [Sample::ZERO; 1024];
        let mut b = [Sample::ZERO; 1024];
        clean.render(&CTX, pitch, 0, 0, &mut a);
        warped.render(&CTX, pitch, MAX_PARAM, MAX_PARAM, &mut b);
        assert_ne!(a, b);
        assert!(peak(&b) > 30000);
    }
    #[test]
    fn resonant_stays_in_range() {
        for mode in [ResonanceMode::Full, ResonanceMode::SecondHalf] {
            let mut osc = PhaseDistortionResonantOscillator::new(&SQUARE_SIN, mode);
            let mut out = [Sample::ZERO; 500];
            osc.render(&CTX, key_to_pitch(45), MAX_PARAM, 0, &mut out);
            assert!(peak(&out) > 0);
        }
    }
    #[test]
    fn odd_lengths_render_in_chunks() {
        let mut one = WaveformOscillator::default();
        let mut two = WaveformOscillator::default();
        let mut whole = [Sample::ZERO; 70];
        one.render(&CTX, key_to_pitch(50), 0, 0, &mut whole);
        let mut parts = [Sample::ZERO; 70];
        let (head, tail) = parts.split_at_mut(33);
        two.render(&CTX, key_to_pitch(50), 0, 0, head);
        two.render(&CTX, key_to_pitch(50), 0, 0, tail);
        assert_eq!(whole, parts);
    }
}
