use wmidi::ControlFunction;

use crate::devices::Shape;
use crate::fixedmath::{clamp_param, Scalar, I17F15};
use crate::midi::cc;
use crate::MAX_PARAM;

/// The number of bit-reduction settings (index 6 is full resolution)
pub const NUM_RESOLUTIONS: usize = 7;
/// The number of decimation settings (index 6 is no decimation)
pub const NUM_DECIMATIONS: usize = 7;
/// The largest signature setting
pub const MAX_SIGNATURE: u8 = 4;

/// Masks applied to each rendered sample, from 2 bits to 16
pub const BIT_REDUCTION_MASKS: [u16; NUM_RESOLUTIONS] =
    [0xc000, 0xe000, 0xf000, 0xf800, 0xff00, 0xfff0, 0xffff];
/// Sample-and-hold periods, in samples
pub const DECIMATION_FACTORS: [usize; NUM_DECIMATIONS] = [24, 12, 6, 4, 3, 2, 1];

/// Per-channel sound parameters, shared by every voice on the channel.
///
/// All 15-bit parameters run from 0 to [MAX_PARAM].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelParams {
    /// Oscillator shape
    pub shape: Shape,
    /// Base timbre
    pub timbre: i16,
    /// How much the envelope adds to timbre
    pub timbre_env_depth: i16,
    /// Base color
    pub color: i16,
    /// How much the envelope adds to color
    pub color_env_depth: i16,
    /// How much the envelope raises pitch
    pub pitch_env_depth: i16,
    /// Envelope attack time
    pub attack: i16,
    /// Envelope decay (release) time
    pub decay: i16,
    /// Output volume
    pub volume: i16,
    /// Pan, 0 (left) to [MAX_PARAM] (right)
    pub pan: i16,
    /// Portamento amount
    pub glide: i16,
    /// Pitch offset, in pitch units (1/128 semitone)
    pub transposition: i16,
    /// Index into [BIT_REDUCTION_MASKS]
    pub resolution: usize,
    /// Index into [DECIMATION_FACTORS]
    pub decimation: usize,
    /// Voice signature waveshaping, 0 (off) to [MAX_SIGNATURE]
    pub signature: u8,
    /// Track pitch like an imperfect analog VCO
    pub vco_flatten: bool,
    /// Let the envelope control the output level
    pub env_to_vca: bool,
    /// Hold at the attack level until Note Off
    pub hold: bool,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            shape: Shape::default(),
            timbre: MAX_PARAM / 2,
            timbre_env_depth: 0,
            color: MAX_PARAM / 2,
            color_env_depth: 0,
            pitch_env_depth: 0,
            attack: 0,
            decay: MAX_PARAM / 2,
            volume: MAX_PARAM,
            pan: MAX_PARAM / 2,
            glide: 0,
            transposition: 0,
            resolution: NUM_RESOLUTIONS - 1,
            decimation: NUM_DECIMATIONS - 1,
            signature: 0,
            vco_flatten: false,
            env_to_vca: true,
            hold: false,
        }
    }
}

impl ChannelParams {
    /// The bit-reduction mask for the current resolution
    pub fn bit_mask(&self) -> u16 {
        BIT_REDUCTION_MASKS[self.resolution.min(NUM_RESOLUTIONS - 1)]
    }
    /// The sample-and-hold period for the current decimation
    pub fn decimation_factor(&self) -> usize {
        DECIMATION_FACTORS[self.decimation.min(NUM_DECIMATIONS - 1)]
    }
    /// The waveshaper blend, `signature^2 * 4095` in raw bits
    pub fn signature_balance(&self) -> Scalar {
        let sig = self.signature.min(MAX_SIGNATURE) as u16;
        Scalar::from_bits(sig * sig * 4095)
    }
    /// Apply a Control Change.  `cc_max` is the value that maps to the top
    /// of each parameter's range; larger values clamp.  Returns false for
    /// unmapped controls.
    pub fn control_change(&mut self, function: ControlFunction, value: u8, cc_max: u8) -> bool {
        let cc_max = cc_max.max(1);
        let v = value as i32;
        let max = cc_max as i32;
        let param = clamp_param(I17F15::from_bits(v * (MAX_PARAM as i32 / max)));
        let index = |steps: i32| (v * steps / max).clamp(0, steps) as usize;
        let toggle = v > max / 2;
        match function {
            cc::SHAPE => self.shape = Shape::from_index(value as usize),
            cc::TIMBRE => self.timbre = param,
            cc::TIMBRE_ENV_DEPTH => self.timbre_env_depth = param,
            cc::COLOR => self.color = param,
            cc::COLOR_ENV_DEPTH => self.color_env_depth = param,
            cc::ATTACK => self.attack = param,
            cc::DECAY => self.decay = param,
            cc::VOLUME => self.volume = param,
            cc::PITCH_ENV_DEPTH => self.pitch_env_depth = param,
            cc::TRANSPOSE => self.transposition = ((v - max / 2) << 7) as i16,
            cc::RESOLUTION => self.resolution = index(NUM_RESOLUTIONS as i32 - 1),
            cc::DECIMATION => self.decimation = index(NUM_DECIMATIONS as i32 - 1),
            cc::SIGNATURE => self.signature = index(MAX_SIGNATURE as i32) as u8,
            cc::VCO_FLATTEN => self.vco_flatten = toggle,
            cc::ENV_TO_VCA => self.env_to_vca = toggle,
            cc::ENV_HOLD => self.hold = toggle,
            cc::PAN => self.pan = param,
            cc::GLIDE => self.glide = param,
            _ => return false,
        }
        true
    }
}
