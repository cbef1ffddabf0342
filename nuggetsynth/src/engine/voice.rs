use fixed::types::I16F16;

use super::channel::ChannelParams;
use crate::context::Context;
use crate::devices::{MacroOscillator, Oscillator, SignatureWaveshaper, AR};
use crate::fixedmath::{clamp_param, interpolate88, key_to_pitch, mix, I17F15};
use crate::tables::VCO_DETUNE;
use crate::{IScalar, Pitch, Sample, Scalar};

const MAX_PITCH: Pitch = Pitch::from_bits(16383);

/// One voice: a macro oscillator with its envelope, VCA and signature
/// waveshaper.  Voices never allocate and are never freed; the engine
/// reassigns them to new notes.
#[derive(Clone)]
pub struct Voice {
    osc: MacroOscillator,
    env: AR,
    shaper: SignatureWaveshaper,
    key: u8,
    velocity: u8,
    triggered: bool,
    gain_lp: I16F16,
}

impl Voice {
    /// Constructor.  `seed` picks the voice's signature curve.
    pub fn new(context: &Context, seed: u64, max_glide_ms: u32) -> Self {
        let mut osc = MacroOscillator::new(context);
        osc.set_max_glide_duration(max_glide_ms);
        Self {
            osc,
            env: AR::new(context),
            shaper: SignatureWaveshaper::new(seed),
            key: 0,
            velocity: 0,
            triggered: false,
            gain_lp: I16F16::ZERO,
        }
    }
    /// The most recently played key
    pub fn key(&self) -> u8 {
        self.key
    }
    /// True if a note has been assigned but not yet started
    pub fn triggered(&self) -> bool {
        self.triggered
    }
    /// The envelope
    pub fn envelope(&self) -> &AR {
        &self.env
    }
    /// Assign a new note.  It starts at the next rendered block.
    pub fn note_on(&mut self, key: u8, velocity: u8) {
        self.key = key;
        self.velocity = velocity;
        self.triggered = true;
    }
    /// Release the note if it is still `key`
    pub fn note_off(&mut self, key: u8) {
        if key == self.key {
            self.env.off();
        }
    }
    /// Render one block (at most [crate::BLOCK_SIZE] samples) into `out`.
    ///
    /// `pitch_offset` is added to the key before the VCO curve, in pitch
    /// units; the channel transposition is added after it.
    pub fn render(
        &mut self,
        context: &Context,
        params: &ChannelParams,
        pitch_offset: i16,
        out: &mut [Sample],
    ) {
        self.env.set_hold(params.hold);
        self.env.set_attack(params.attack);
        self.env.set_release(params.decay);
        let env = self.env.advance(out.len());

        let depth = |amount: i16| I17F15::from_num(env.wide_mul(IScalar::from_bits(amount)));
        let modulate =
            |base: i16, amount: i16| clamp_param(I17F15::from_bits(base as i32) + depth(amount));
        let timbre = modulate(params.timbre, params.timbre_env_depth);
        let color = modulate(params.color, params.color_env_depth);

        // a full envelope bends up by 64 semitones
        let bend = Pitch::from_num(depth(params.pitch_env_depth) * 64);
        let mut pitch = key_to_pitch(self.key)
            .saturating_add(bend)
            .saturating_add(Pitch::from_bits(pitch_offset))
            .clamp(Pitch::ZERO, MAX_PITCH);
        if params.vco_flatten {
            let index = (pitch.to_bits() as u16) << 2;
            pitch = Pitch::from_bits(interpolate88(&VCO_DETUNE, index) as i16);
        }
        let pitch = pitch.saturating_add(Pitch::from_bits(params.transposition));

        self.osc.set_shape(context, params.shape);
        self.osc.set_glide(params.glide);
        if self.triggered {
            self.osc.strike(context);
            self.env.on(IScalar::from_bits((self.velocity as i16) << 8));
            self.triggered = false;
        }
        self.osc.render(context, pitch, timbre, color, out);

        let factor = params.decimation_factor();
        let mask = params.bit_mask() as i16;
        let target = if params.env_to_vca {
            I16F16::from_num(env)
        } else {
            I16F16::from_num(Scalar::MAX)
        };
        let signature = params.signature_balance();
        let mut held = Sample::ZERO;
        for (i, s) in out.iter_mut().enumerate() {
            if i % factor == 0 {
                held = Sample::from_bits(s.to_bits() & mask);
            }
            let gain = Scalar::saturating_from_num(self.gain_lp);
            let sample = Sample::from_num(held.wide_mul_unsigned(gain));
            self.gain_lp += (target - self.gain_lp) >> 4;
            *s = mix(sample, self.shaper.transform(sample), signature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{EnvelopeSegment, Shape};
    use crate::midi::cc;
    use crate::BLOCK_SIZE;

    const CTX: Context = Context::new_441();

    fn peak(buf: &[Sample]) -> Sample {
        buf.iter().map(|s| s.saturating_abs()).max().unwrap_or(Sample::ZERO)
    }

    /// Render `blocks` blocks and return the last one
    fn play(
        voice: &mut Voice,
        params: &ChannelParams,
        pitch_offset: i16,
        blocks: usize,
    ) -> [Sample; BLOCK_SIZE] {
        let mut out = [Sample::ZERO; BLOCK_SIZE];
        for _ in 0..blocks {
            voice.render(&CTX, params, pitch_offset, &mut out);
        }
        out
    }

    fn played(key: u8) -> Voice {
        let mut voice = Voice::new(&CTX, 1, 1000);
        voice.note_on(key, 127);
        voice
    }

    #[test]
    fn silent_until_played() {
        let mut voice = Voice::new(&CTX, 1, 1000);
        let params = ChannelParams::default();
        let mut out = [Sample::ZERO; BLOCK_SIZE];
        for _ in 0..10 {
            voice.render(&CTX, &params, 0, &mut out);
            assert_eq!(peak(&out), Sample::ZERO);
        }
    }
    #[test]
    fn note_starts_on_next_block() {
        let mut voice = Voice::new(&CTX, 1, 1000);
        let params = ChannelParams::default();
        let mut out = [Sample::ZERO; BLOCK_SIZE];
        voice.note_on(69, 127);
        assert!(voice.triggered());
        voice.render(&CTX, &params, 0, &mut out);
        assert!(!voice.triggered());
        assert_eq!(voice.envelope().segment(), EnvelopeSegment::Attack);
        let mut loudest = Sample::ZERO;
        for _ in 0..50 {
            voice.render(&CTX, &params, 0, &mut out);
            loudest = loudest.max(peak(&out));
        }
        assert!(loudest.to_bits() > 10000, "{}", loudest);
    }
    #[test]
    fn vca_bypass_plays_at_full_gain() {
        let mut voice = Voice::new(&CTX, 1, 1000);
        let params = ChannelParams {
            env_to_vca: false,
            timbre: 0,
            ..Default::default()
        };
        let out = play(&mut voice, &params, 0, 100);
        // a free-running sine, no note needed
        assert!(peak(&out) > Sample::ZERO);
        assert!(voice.gain_lp.to_bits() > 65000);
    }
    #[test]
    fn bit_reduction_quantizes() {
        let mut params = ChannelParams {
            env_to_vca: false,
            shape: Shape::TriangleSaw,
            ..Default::default()
        };
        params.control_change(cc::RESOLUTION, 0, 15);
        assert_eq!(params.resolution, 0);
        let out = play(&mut played(69), &params, 0, 100);
        // four levels, each scaled by the (settled) gain
        let mut levels: [Option<Sample>; 8] = [None; 8];
        for s in out.iter() {
            if !levels.contains(&Some(*s)) {
                let slot = levels.iter().position(|l| l.is_none()).unwrap();
                levels[slot] = Some(*s);
            }
        }
        assert!(levels.iter().filter(|l| l.is_some()).count() <= 4);

        let full = play(&mut played(69), &ChannelParams { resolution: 6, ..params }, 0, 100);
        assert!(full.iter().any(|s| !levels.contains(&Some(*s))));
    }
    #[test]
    fn decimation_holds_samples() {
        let mut params = ChannelParams {
            env_to_vca: false,
            ..Default::default()
        };
        params.control_change(cc::DECIMATION, 0, 15);
        assert_eq!(params.decimation_factor(), 24);
        let held = play(&mut played(69), &params, 0, 100);
        assert!(held[..24].iter().all(|s| *s == held[0]));
        assert!(held[24..].iter().all(|s| *s == held[24]));

        let every = ChannelParams { decimation: 6, ..params };
        let full = play(&mut played(69), &every, 0, 100);
        assert_eq!(full[0], held[0]);
        assert_eq!(full[24], held[24]);
        assert!(full[..24].iter().any(|s| *s != full[0]));
    }
    #[test]
    fn pitch_offset_shifts_the_key() {
        let params = ChannelParams::default();
        let octave_up = play(&mut played(69), &params, 12 << 7, 20);
        let a5 = play(&mut played(81), &params, 0, 20);
        let a4 = play(&mut played(69), &params, 0, 20);
        assert_eq!(octave_up, a5);
        assert_ne!(octave_up, a4);

        // offsets clamp at the bottom of the pitch range
        let floor = play(&mut played(10), &params, i16::MIN, 20);
        let lowest = play(&mut played(0), &params, 0, 20);
        assert_eq!(floor, lowest);
    }
    #[test]
    fn vco_flatten_follows_the_curve() {
        let flat = ChannelParams {
            vco_flatten: true,
            ..Default::default()
        };
        let straight = ChannelParams::default();
        // middle C is where the curve is aligned
        assert_eq!(
            play(&mut played(60), &flat, 0, 20),
            play(&mut played(60), &straight, 0, 20)
        );

        let key = 100u8;
        let detuned = VCO_DETUNE[2 * key as usize] as i16 - ((key as i16) << 7);
        assert!(detuned < 0, "{}", detuned);
        let flattened = play(&mut played(key), &flat, 0, 20);
        assert_eq!(flattened, play(&mut played(key), &straight, detuned, 20));
        assert_ne!(flattened, play(&mut played(key), &straight, 0, 20));
    }
    #[test]
    fn signature_blends_in_the_waveshaper() {
        let plain = ChannelParams {
            env_to_vca: false,
            ..Default::default()
        };
        let mut shaped = plain.clone();
        shaped.control_change(cc::SIGNATURE, 15, 15);
        assert!(shaped.signature > 0);

        let before = play(&mut played(69), &plain, 0, 100);
        let after = play(&mut played(69), &shaped, 0, 100);
        assert_ne!(before, after);
        // same seed, same curve
        assert_eq!(after, play(&mut played(69), &shaped, 0, 100));
    }
    #[test]
    fn hold_waits_for_note_off() {
        let mut voice = Voice::new(&CTX, 1, 1000);
        let params = ChannelParams {
            hold: true,
            ..Default::default()
        };
        voice.note_on(60, 100);
        play(&mut voice, &params, 0, 200);
        assert_eq!(voice.envelope().segment(), EnvelopeSegment::Hold);
        voice.note_off(61);
        assert_eq!(voice.envelope().segment(), EnvelopeSegment::Hold);
        voice.note_off(60);
        assert_eq!(voice.envelope().segment(), EnvelopeSegment::Release);
    }
}
