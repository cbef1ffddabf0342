use super::osc::WaveformOscillator;
use super::Oscillator;
use crate::context::Context;
use crate::fixedmath::{clip, interpolate824, Sample, I17F15};
use crate::tables::SAWTOOTH;
use crate::Pitch;

/// Which output of a [SVF] is rendered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfMode {
    /// Low pass
    #[default]
    LowPass,
    /// Band pass
    BandPass,
    /// High pass
    HighPass,
}

// The integrators saturate here, one step inside the sample range
const LIMIT: I17F15 = I17F15::from_bits(32767);

/// A Chamberlin state-variable filter.
///
/// Cutoff is given in pitch units (MIDI note << 7) and resonance as a 15-bit
/// parameter.  The integrator gain and damping are looked up from the
/// sample-rate tables, and only when one of them has changed.  The state
/// is kept in a wide format since the high-pass signal can reach twice full
/// scale.
#[derive(Clone)]
pub struct SVF {
    dirty: bool,
    frequency: i16,
    resonance: i16,
    f: I17F15,
    damp: I17F15,
    lp: I17F15,
    bp: I17F15,
    mode: SvfMode,
}

impl Default for SVF {
    fn default() -> Self {
        Self {
            dirty: true,
            frequency: 33 << 7,
            resonance: 16384,
            f: I17F15::ZERO,
            damp: I17F15::ZERO,
            lp: I17F15::ZERO,
            bp: I17F15::ZERO,
            mode: SvfMode::LowPass,
        }
    }
}

impl SVF {
    /// Constructor
    pub fn new() -> Self {
        Default::default()
    }
    /// Set the cutoff, in pitch units.  Negative values are treated as zero.
    pub fn set_cutoff(&mut self, frequency: i16) {
        let frequency = frequency.max(0);
        self.dirty |= frequency != self.frequency;
        self.frequency = frequency;
    }
    /// Set the resonance.  Negative values are treated as zero.
    pub fn set_resonance(&mut self, resonance: i16) {
        let resonance = resonance.max(0);
        self.dirty |= resonance != self.resonance;
        self.resonance = resonance;
    }
    /// Select the output
    pub fn set_mode(&mut self, mode: SvfMode) {
        self.mode = mode;
    }
    /// Filter `buf` in place
    pub fn process(&mut self, context: &Context, buf: &mut [Sample]) {
        if self.dirty {
            let tables = context.tables();
            let f = interpolate824(&tables.svf_cutoff, (self.frequency as u32) << 17);
            let damp = interpolate824(&tables.svf_damp, (self.resonance as u32) << 17);
            self.f = I17F15::from_bits(f as i32);
            self.damp = I17F15::from_bits(damp as i32);
            self.dirty = false;
        }
        for sample in buf.iter_mut() {
            let notch = I17F15::from_num(*sample) - self.bp * self.damp;
            self.lp = (self.lp + self.f * self.bp).clamp(-LIMIT, LIMIT);
            let hp = notch - self.lp;
            self.bp = (self.bp + self.f * hp).clamp(-LIMIT, LIMIT);
            *sample = match self.mode {
                SvfMode::LowPass => Sample::from_num(self.lp),
                SvfMode::BandPass => Sample::from_num(self.bp),
                SvfMode::HighPass => clip(hp),
            };
        }
    }
}

/// A sawtooth through a [SVF].
///
/// Timbre sets the cutoff (across the whole MIDI note range) and color the
/// resonance.
#[derive(Clone)]
pub struct FilteredOscillator {
    osc: WaveformOscillator,
    filter: SVF,
}

impl FilteredOscillator {
    /// Constructor
    pub fn new(mode: SvfMode) -> Self {
        let mut filter = SVF::new();
        filter.set_mode(mode);
        Self {
            osc: WaveformOscillator::new(&SAWTOOTH, &SAWTOOTH),
            filter,
        }
    }
}

impl Default for FilteredOscillator {
    fn default() -> Self {
        Self::new(SvfMode::LowPass)
    }
}

impl Oscillator for FilteredOscillator {
    fn set_glide(&mut self, glide: i16) {
        self.osc.set_glide(glide);
    }
    fn set_max_glide_duration(&mut self, milliseconds: u32) {
        self.osc.set_max_glide_duration(milliseconds);
    }
    fn render(
        &mut self,
        context: &Context,
        pitch: Pitch,
        timbre: i16,
        color: i16,
        out: &mut [Sample],
    ) {
        self.osc.render(context, pitch, 0, 0, out);
        self.filter.set_cutoff(timbre.max(0) >> 1);
        self.filter.set_resonance(color);
        self.filter.process(context, out);
    }
}
