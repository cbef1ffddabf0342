use crate::fixedmath::{clip, IScalar, Sample, Scalar, I17F15};
use crate::{BLOCK_SIZE, MAX_PARAM};

/// How voices are spread across the two output channels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StereoMode {
    /// Pan is ignored and both channels carry the same mix
    Mono,
    /// Each channel's pan places its voices between left and right
    #[default]
    Discrete,
}

/// How a 16 bit sample is represented in the output word
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Two's complement
    #[default]
    Signed,
    /// Zero at mid-scale (0x8000), as used by PWM and some DACs
    OffsetBinary,
}

/// The layout of a packed output frame: left in bits 15:0, right in bits
/// 31:16, each truncated to `resolution_bits` and right-aligned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputFormat {
    /// Mono or stereo
    pub stereo: StereoMode,
    /// Sample encoding
    pub encoding: Encoding,
    /// Bits per sample, 1 to 16
    pub resolution_bits: u8,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            stereo: StereoMode::Discrete,
            encoding: Encoding::Signed,
            resolution_bits: 16,
        }
    }
}

impl OutputFormat {
    /// Encode one sample into the low bits of a half-frame
    pub fn encode(&self, sample: Sample) -> u16 {
        let bits = match self.encoding {
            Encoding::Signed => sample.to_bits() as u16,
            Encoding::OffsetBinary => (sample.to_bits() as u16) ^ 0x8000,
        };
        bits >> (16 - self.resolution_bits.clamp(1, 16))
    }
    /// Pack a frame
    pub fn pack(&self, left: Sample, right: Sample) -> u32 {
        self.encode(left) as u32 | (self.encode(right) as u32) << 16
    }
}

/// The gain of a channel at `volume` (0 to [MAX_PARAM]).  Full volume mixes
/// a voice in at half scale, leaving headroom for the others.
pub fn volume_gain(volume: i16) -> Scalar {
    Scalar::from_num(IScalar::from_bits(volume.max(0))) >> 1
}

/// Left/right gains for a channel at `volume` and `pan` (0 is hard left,
/// [MAX_PARAM] hard right).  The center keeps (almost) full volume on both
/// sides.
pub fn pan_gains(volume: i16, pan: i16) -> (Scalar, Scalar) {
    let volume = IScalar::from_bits(volume.max(0));
    let pan = pan.clamp(0, MAX_PARAM);
    let left = IScalar::from_bits((MAX_PARAM - pan).saturating_mul(2));
    let right = IScalar::from_bits(pan.saturating_mul(2));
    let side = |level: IScalar| volume_gain(IScalar::from_num(volume.wide_mul(level)).to_bits());
    (side(left), side(right))
}

/// Accumulators for one block of mixed output, wide enough that no number of
/// voices can overflow them
pub struct MixBus {
    left: [I17F15; BLOCK_SIZE],
    right: [I17F15; BLOCK_SIZE],
}

impl Default for MixBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MixBus {
    /// An empty bus
    pub const fn new() -> Self {
        Self {
            left: [I17F15::ZERO; BLOCK_SIZE],
            right: [I17F15::ZERO; BLOCK_SIZE],
        }
    }
    /// Add a voice's block, scaled by a gain on each side
    pub fn add(&mut self, samples: &[Sample], left_gain: Scalar, right_gain: Scalar) {
        let acc = self.left.iter_mut().zip(self.right.iter_mut());
        for (s, (l, r)) in samples.iter().zip(acc) {
            *l += I17F15::from_num(s.wide_mul_unsigned(left_gain));
            *r += I17F15::from_num(s.wide_mul_unsigned(right_gain));
        }
    }
    /// Clip and pack the first `out.len()` frames
    pub fn write(&self, format: &OutputFormat, out: &mut [u32]) {
        let acc = self.left.iter().zip(self.right.iter());
        for (frame, (l, r)) in out.iter_mut().zip(acc) {
            *frame = format.pack(clip(*l), clip(*r));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(bits: i16) -> Sample {
        Sample::from_bits(bits)
    }

    #[test]
    fn packing() {
        let format = OutputFormat::default();
        assert_eq!(format.pack(s(1), s(-1)), 0xFFFF_0001);
        let offset = OutputFormat {
            encoding: Encoding::OffsetBinary,
            ..format
        };
        assert_eq!(offset.pack(s(0), Sample::MIN), 0x0000_8000);
        let twelve = OutputFormat {
            resolution_bits: 12,
            ..offset
        };
        assert_eq!(twelve.pack(Sample::MAX, s(0)), 0x0800_0FFF);
        let signed_twelve = OutputFormat {
            resolution_bits: 12,
            ..format
        };
        assert_eq!(signed_twelve.pack(s(-16), s(16)), 0x0001_0FFF);
    }
    #[test]
    fn pan_law() {
        let full = Scalar::from_bits(MAX_PARAM as u16 - 1);
        assert_eq!(pan_gains(MAX_PARAM, 0), (full, Scalar::ZERO));
        assert_eq!(pan_gains(MAX_PARAM, MAX_PARAM), (Scalar::ZERO, full));
        let (l, r) = pan_gains(MAX_PARAM, MAX_PARAM / 2);
        assert!((l.to_bits() as i32 - r.to_bits() as i32).abs() <= 2);
        assert!(l.to_bits() > 32000);
        assert_eq!(pan_gains(-5, MAX_PARAM / 2), (Scalar::ZERO, Scalar::ZERO));
    }
    #[test]
    fn volume_is_half_scale() {
        assert_eq!(volume_gain(MAX_PARAM), Scalar::from_bits(MAX_PARAM as u16));
        assert_eq!(volume_gain(-1), Scalar::ZERO);
        let mut bus = MixBus::new();
        bus.add(&[s(20000), s(-20000)], volume_gain(MAX_PARAM), volume_gain(MAX_PARAM / 2));
        let mut out = [0u32; 2];
        bus.write(&OutputFormat::default(), &mut out);
        // 20000 * 32767 >> 16 and 20000 * 16383 >> 16, floored
        assert_eq!(out[0], (4999u32 << 16) | 9999);
        assert_eq!(out[1], ((-5000i16 as u16 as u32) << 16) | (-10000i16 as u16 as u32));
    }
    #[test]
    fn saturates_instead_of_wrapping() {
        let gain = volume_gain(MAX_PARAM);
        let mut bus = MixBus::new();
        for _ in 0..8 {
            bus.add(&[Sample::MAX, Sample::MIN, s(100)], gain, gain);
        }
        let mut out = [0u32; 3];
        bus.write(&OutputFormat::default(), &mut out);
        assert_eq!(out[0], 0x7FFF_7FFF);
        assert_eq!(out[1], 0x8000_8000);
        assert_eq!(out[2], (8 * 49) << 16 | (8 * 49));
    }
}
