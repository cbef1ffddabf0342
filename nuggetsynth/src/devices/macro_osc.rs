use super::filt::{FilteredOscillator, SvfMode};
use super::kick::WaveformKick;
use super::osc::{
    PhaseDistortionLookupOscillator, PhaseDistortionResonantOscillator, ResonanceMode,
    WaveformOscillator,
};
use super::Oscillator;
use crate::context::Context;
use crate::tables::{
    SAWTOOTH, SINE, SIN_SQUARE, SQUARE_FULL_SIN, SQUARE_SIN, TRIANGLE, TRIANGLE_FULL_SIN,
    TRIANGLE_SIN, Waveform,
};
use crate::{Pitch, Sample};

/// Every sound a [MacroOscillator] can make
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shape {
    /// Crossfade from sine (timbre 0) to triangle
    #[default]
    SineTriangle = 0,
    /// Crossfade from triangle (timbre 0) to sawtooth
    TriangleSaw,
    /// Phase-warped sine; timbre is the amount, color the warp curve
    PhaseWarp,
    /// Resonant phase distortion of a square/sine hybrid
    ResonantSquare,
    /// As [Shape::ResonantSquare], replaying only the second half
    ResonantSquareHalf,
    /// Resonant phase distortion of a triangle/sine hybrid
    ResonantTriangle,
    /// As [Shape::ResonantTriangle], replaying only the second half
    ResonantTriangleHalf,
    /// Resonant phase distortion of a sine/square hybrid
    ResonantSineSquare,
    /// Kick drum; timbre is the punch and color its decay
    Kick,
    /// Low-passed sawtooth; timbre is the cutoff and color the resonance
    LowPassSaw,
    /// Band-passed sawtooth; timbre is the cutoff and color the resonance
    BandPassSaw,
}

impl Shape {
    /// The number of shapes
    pub const COUNT: usize = 11;

    const ALL: [Shape; Self::COUNT] = [
        Shape::SineTriangle,
        Shape::TriangleSaw,
        Shape::PhaseWarp,
        Shape::ResonantSquare,
        Shape::ResonantSquareHalf,
        Shape::ResonantTriangle,
        Shape::ResonantTriangleHalf,
        Shape::ResonantSineSquare,
        Shape::Kick,
        Shape::LowPassSaw,
        Shape::BandPassSaw,
    ];

    /// Select a shape by index, clamping out-of-range indices to the last one
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::COUNT - 1)]
    }
}

#[derive(Clone)]
enum Active {
    Table(WaveformOscillator),
    Lookup(PhaseDistortionLookupOscillator),
    Resonant(PhaseDistortionResonantOscillator),
    Kick(WaveformKick),
    Filtered(FilteredOscillator),
}

impl Active {
    fn build(context: &Context, shape: Shape) -> Self {
        use ResonanceMode::{Full, SecondHalf};
        let resonant = |table: &'static Waveform, mode| {
            Self::Resonant(PhaseDistortionResonantOscillator::new(table, mode))
        };
        match shape {
            Shape::SineTriangle => Self::Table(WaveformOscillator::new(&SINE, &TRIANGLE)),
            Shape::TriangleSaw => Self::Table(WaveformOscillator::new(&TRIANGLE, &SAWTOOTH)),
            Shape::PhaseWarp => Self::Lookup(PhaseDistortionLookupOscillator::new(&SINE)),
            Shape::ResonantSquare => resonant(&SQUARE_SIN, Full),
            Shape::ResonantSquareHalf => resonant(&SQUARE_FULL_SIN, SecondHalf),
            Shape::ResonantTriangle => resonant(&TRIANGLE_SIN, Full),
            Shape::ResonantTriangleHalf => resonant(&TRIANGLE_FULL_SIN, SecondHalf),
            Shape::ResonantSineSquare => resonant(&SIN_SQUARE, Full),
            Shape::Kick => Self::Kick(WaveformKick::new(context)),
            Shape::LowPassSaw => Self::Filtered(FilteredOscillator::new(SvfMode::LowPass)),
            Shape::BandPassSaw => Self::Filtered(FilteredOscillator::new(SvfMode::BandPass)),
        }
    }
}

// Forward a call to whichever oscillator is active
macro_rules! dispatch {
    ($active:expr, $o:ident => $call:expr) => {
        match $active {
            Active::Table($o) => $call,
            Active::Lookup($o) => $call,
            Active::Resonant($o) => $call,
            Active::Kick($o) => $call,
            Active::Filtered($o) => $call,
        }
    };
}

/// An oscillator that can take on any [Shape].
///
/// Changing shape replaces the underlying oscillator (and its state), so
/// it takes effect at a block boundary.  The glide setting carries over.
#[derive(Clone)]
pub struct MacroOscillator {
    shape: Shape,
    glide: i16,
    max_glide_ms: u32,
    active: Active,
}

impl MacroOscillator {
    /// Constructor, starting with the default shape
    pub fn new(context: &Context) -> Self {
        Self {
            shape: Shape::default(),
            glide: 0,
            max_glide_ms: 1000,
            active: Active::build(context, Shape::default()),
        }
    }
    /// The current shape
    pub fn shape(&self) -> Shape {
        self.shape
    }
    /// Change shape.  Does nothing if `shape` is already selected.
    pub fn set_shape(&mut self, context: &Context, shape: Shape) {
        if shape != self.shape {
            self.shape = shape;
            self.active = Active::build(context, shape);
            let (glide, max_glide_ms) = (self.glide, self.max_glide_ms);
            dispatch!(&mut self.active, o => {
                o.set_glide(glide);
                o.set_max_glide_duration(max_glide_ms)
            });
        }
    }
}

impl Oscillator for MacroOscillator {
    fn strike(&mut self, context: &Context) {
        dispatch!(&mut self.active, o => o.strike(context));
    }
    fn set_glide(&mut self, glide: i16) {
        self.glide = glide;
        dispatch!(&mut self.active, o => o.set_glide(glide));
    }
    fn set_max_glide_duration(&mut self, milliseconds: u32) {
        self.max_glide_ms = milliseconds;
        dispatch!(&mut self.active, o => o.set_max_glide_duration(milliseconds));
    }
    fn render(
        &mut self,
        context: &Context,
        pitch: Pitch,
        timbre: i16,
        color: i16,
        out: &mut [Sample],
    ) {
        dispatch!(&mut self.active, o => o.render(context, pitch, timbre, color, out));
    }
}
