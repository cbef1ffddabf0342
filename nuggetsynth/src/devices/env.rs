use crate::context::Context;
use crate::fixedmath::{interpolate824, mix, IScalar, Scalar};
use crate::tables::{Curve, SampleRateTables, ENV_FAST_START, ENV_LINEAR, ENV_SLOW_START};

/// The longest duration (at the slowest setting) of an envelope segment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentTime {
    /// Up to 10 seconds
    S10 = 0,
    /// Up to 5 seconds
    S5 = 1,
    /// Up to 2 seconds
    S2 = 2,
    /// Up to 1 second
    S1 = 3,
    /// Up to half a second
    Half = 4,
    /// Up to a quarter second
    Quarter = 5,
}

/// The shape of an envelope segment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentCurve {
    /// Moves quickly at first, then settles (like an RC circuit charging)
    Exponential,
    /// A straight line
    Linear,
    /// Moves slowly at first, then quickly
    Logarithmic,
}

impl SegmentCurve {
    fn table(self) -> &'static Curve {
        match self {
            Self::Exponential => &ENV_FAST_START,
            Self::Linear => &ENV_LINEAR,
            Self::Logarithmic => &ENV_SLOW_START,
        }
    }
}

/// The segment an [AR] envelope is currently in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeSegment {
    /// Rising toward the trigger velocity
    Attack = 0,
    /// Holding the attack level until released
    Hold = 1,
    /// Falling toward zero
    Release = 2,
    /// Silent, waiting for a trigger
    Dead = 3,
}

impl EnvelopeSegment {
    fn next(self) -> Self {
        match self {
            Self::Attack => Self::Hold,
            Self::Hold => Self::Release,
            Self::Release | Self::Dead => Self::Dead,
        }
    }
}

/// An attack/release envelope with an optional hold segment.
///
/// Each segment runs a 32 bit phase accumulator from 0 to overflow and reads
/// the segment's curve to move from its start value to its target.  Without
/// hold, the envelope falls straight into release once the attack finishes
/// (an AD envelope); with hold it stays at the attack level until [AR::off].
///
/// The segment lengths come from the per-sample-rate increment tables, so the
/// envelope must be rendered once per output sample.
#[derive(Clone)]
pub struct AR {
    tables: &'static SampleRateTables,
    increment: [u32; 4],
    target: [IScalar; 4],
    segment: EnvelopeSegment,
    a: IScalar,
    b: IScalar,
    value: IScalar,
    phase: u32,
    hold: bool,
    attack: i16,
    release: i16,
    attack_time: SegmentTime,
    release_time: SegmentTime,
    attack_curve: &'static Curve,
    release_curve: &'static Curve,
    curve: &'static Curve,
}

impl AR {
    /// Constructor.  Starts dead, with a short attack and medium release.
    pub fn new(context: &Context) -> Self {
        let mut env = Self {
            tables: context.tables(),
            increment: [0; 4],
            target: [IScalar::MAX, IScalar::ZERO, IScalar::ZERO, IScalar::ZERO],
            segment: EnvelopeSegment::Dead,
            a: IScalar::ZERO,
            b: IScalar::ZERO,
            value: IScalar::ZERO,
            phase: 0,
            hold: false,
            attack: 1000,
            release: 16000,
            attack_time: SegmentTime::S2,
            release_time: SegmentTime::S5,
            attack_curve: &ENV_FAST_START,
            release_curve: &ENV_SLOW_START,
            curve: &ENV_FAST_START,
        };
        env.update_increments();
        env
    }
    /// Enable or disable the hold segment
    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }
    /// Set the range of the attack time parameter
    pub fn set_attack_time_range(&mut self, time: SegmentTime) {
        self.attack_time = time;
        self.update_increments();
    }
    /// Set the range of the release time parameter
    pub fn set_release_time_range(&mut self, time: SegmentTime) {
        self.release_time = time;
        self.update_increments();
    }
    /// Set the attack curve.  Takes effect at the next trigger.
    pub fn set_attack_curve(&mut self, curve: SegmentCurve) {
        self.attack_curve = curve.table();
    }
    /// Set the release curve.  Takes effect at the next release.
    pub fn set_release_curve(&mut self, curve: SegmentCurve) {
        self.release_curve = curve.table();
    }
    /// Set the attack time, 0 (fastest) to [crate::MAX_PARAM] (slowest)
    pub fn set_attack(&mut self, attack: i16) {
        if attack != self.attack {
            self.attack = attack;
            self.update_increments();
        }
    }
    /// Set the release time, 0 (fastest) to [crate::MAX_PARAM] (slowest)
    pub fn set_release(&mut self, release: i16) {
        if release != self.release {
            self.release = release;
            self.update_increments();
        }
    }
    /// Start the attack segment, rising toward `velocity` from the current
    /// value (negative velocities are treated as zero)
    pub fn on(&mut self, velocity: IScalar) {
        self.target[EnvelopeSegment::Attack as usize] = velocity.max(IScalar::ZERO);
        self.trigger(EnvelopeSegment::Attack);
    }
    /// Start the release segment from the current value, unless already
    /// releasing or dead
    pub fn off(&mut self) {
        if !matches!(self.segment, EnvelopeSegment::Release | EnvelopeSegment::Dead) {
            self.trigger(EnvelopeSegment::Release);
        }
    }
    /// The current segment
    pub fn segment(&self) -> EnvelopeSegment {
        self.segment
    }
    /// The most recently rendered value
    pub fn value(&self) -> IScalar {
        self.value
    }
    /// Advance one sample and return the new value
    pub fn render(&mut self) -> IScalar {
        let increment = self.increment[self.segment as usize];
        self.phase = self.phase.wrapping_add(increment);
        if self.phase < increment {
            // the accumulator overflowed: the segment is complete
            self.value = self.b;
            self.trigger(self.segment.next());
        }
        if self.increment[self.segment as usize] != 0 {
            let balance = Scalar::from_bits(interpolate824(self.curve, self.phase));
            self.value = mix(self.a, self.b, balance);
        }
        self.value
    }
    /// Fill `out` with successive values
    pub fn render_buf(&mut self, out: &mut [IScalar]) {
        for v in out.iter_mut() {
            *v = self.render();
        }
    }
    /// Advance `samples` samples and return the final value
    pub fn advance(&mut self, samples: usize) -> IScalar {
        for _ in 0..samples {
            self.render();
        }
        self.value
    }
    fn trigger(&mut self, segment: EnvelopeSegment) {
        let mut segment = segment;
        if segment == EnvelopeSegment::Dead {
            self.value = IScalar::ZERO;
        } else if segment == EnvelopeSegment::Hold && !self.hold {
            segment = EnvelopeSegment::Release;
        }
        self.a = self.value.max(IScalar::ZERO);
        self.b = self.target[segment as usize];
        self.segment = segment;
        self.phase = 0;
        self.curve = match segment {
            EnvelopeSegment::Attack => self.attack_curve,
            _ => self.release_curve,
        };
    }
    fn update_increments(&mut self) {
        self.increment[EnvelopeSegment::Attack as usize] =
            self.increment_for(self.attack_time, self.attack);
        self.increment[EnvelopeSegment::Release as usize] =
            self.increment_for(self.release_time, self.release);
    }
    fn increment_for(&self, time: SegmentTime, param: i16) -> u32 {
        let idx = (param.max(0) >> 8) as usize;
        self.tables.env_increments[time as usize][idx]
    }
}
