use super::env::{SegmentTime, AR};
use super::phase::PitchDecay;
use super::Oscillator;
use crate::context::Context;
use crate::fixedmath::{interpolate824_buf, modulate, IScalar, Sample};
use crate::tables::{Waveform, SINE};
use crate::{Pitch, BLOCK_SIZE};

/// A synthesized kick drum: a waveform whose pitch falls from a "punch"
/// offset down to the played note, shaped by its own attack/release envelope.
///
/// Timbre sets the punch and color how slowly it decays.  The drum is silent
/// until struck.
#[derive(Clone)]
pub struct WaveformKick {
    env: AR,
    phase: PitchDecay,
    waveform: &'static Waveform,
    struck: bool,
}

impl WaveformKick {
    /// Constructor
    pub fn new(context: &Context) -> Self {
        let mut env = AR::new(context);
        env.set_attack_time_range(SegmentTime::Quarter);
        env.set_attack(0);
        env.set_release_time_range(SegmentTime::S2);
        Self {
            env,
            phase: PitchDecay::default(),
            waveform: &SINE,
            struck: false,
        }
    }
}

impl Oscillator for WaveformKick {
    fn strike(&mut self, _context: &Context) {
        self.struck = true;
    }
    fn render(
        &mut self,
        context: &Context,
        pitch: Pitch,
        timbre: i16,
        color: i16,
        out: &mut [Sample],
    ) {
        self.phase.set_punch(timbre);
        self.phase.set_punch_decay(color);
        if self.struck {
            // the pitch for this block is only known now
            self.phase.on(context, pitch);
            self.env.on(IScalar::MAX);
            self.struck = false;
        }
        let mut phase = [0u32; BLOCK_SIZE];
        let mut env = [IScalar::ZERO; BLOCK_SIZE];
        for chunk in out.chunks_mut(BLOCK_SIZE) {
            let len = chunk.len();
            let phase = &mut phase[..len];
            let env = &mut env[..len];
            self.phase.render(phase);
            self.env.render_buf(env);
            interpolate824_buf(self.waveform, phase, chunk);
            modulate(chunk, env);
        }
    }
}
