//! Fixed-point math primitives used throughout the synthesizer.
//!
//! Audio and control signals are carried in the `fixed` crate's Q formats,
//! so the binary point travels with the type.  Wide products are formed with
//! `wide_mul` and narrowed with `from_num`, which discards fractional bits
//! (rounding toward negative infinity), and anything that could leave its
//! range saturates instead of wrapping.  Output is identical on every
//! target.  Table lookups are the exception: they index with raw integer
//! phases.

pub use fixed::types::{I17F15, I1F15, U0F16, U16F16, U17F15, U32F0};

use crate::tables::{Waveform, TABLE_SIZE};
use crate::{Pitch, MAX_PARAM};

/// A 16 bit audio sample in the interval `[-1, 1)`
pub type Sample = I1F15;
/// A 16 bit unsigned value in the interval `[0, 1)`, used for gains and
/// balances.  0xFFFF is slightly less than 1.0.
pub type Scalar = U0F16;
/// A signed 16 bit value in the interval `[-1, 1)`: envelope levels,
/// modulation depths and other 15-bit parameters used as multipliers
pub type IScalar = I1F15;

/// A value that can be stored in an interpolated lookup table
pub trait TableValue: Copy {
    /// Widen to the intermediate type used for interpolation
    fn widen(self) -> i64;
    /// Narrow an interpolated value back to the table type.  Interpolation
    /// never leaves the range spanned by two table entries, so this is exact.
    fn narrow(value: i64) -> Self;
}

impl TableValue for i16 {
    fn widen(self) -> i64 {
        self as i64
    }
    fn narrow(value: i64) -> Self {
        value as i16
    }
}

impl TableValue for u16 {
    fn widen(self) -> i64 {
        self as i64
    }
    fn narrow(value: i64) -> Self {
        value as u16
    }
}

/// Linear interpolation into a 257-entry table with a 32 bit phase: the top
/// 8 bits select the entry and the next 16 bits are the fraction.
///
/// The product `(b - a) * frac` needs 33 bits for tables with full-scale
/// jumps (e.g. square waves), so it is computed in 64 bits.
#[inline(always)]
pub fn interpolate824<T: TableValue>(table: &[T; TABLE_SIZE], phase: u32) -> T {
    let idx = (phase >> 24) as usize;
    let a = table[idx].widen();
    let b = table[idx + 1].widen();
    let frac = ((phase >> 8) & 0xffff) as i64;
    T::narrow(a + (((b - a) * frac) >> 16))
}

/// Linear interpolation into a 257-entry table with a 16 bit index: the top
/// 8 bits select the entry and the low 8 bits are the fraction.
#[inline(always)]
pub fn interpolate88<T: TableValue>(table: &[T; TABLE_SIZE], index: u16) -> T {
    let idx = (index >> 8) as usize;
    let a = table[idx].widen() as i32;
    let b = table[idx + 1].widen() as i32;
    let frac = (index & 0xff) as i32;
    T::narrow((a + (((b - a) * frac) >> 8)) as i64)
}

/// Interpolate a whole buffer of phases into `out`
pub fn interpolate824_buf(table: &Waveform, phase: &[u32], out: &mut [Sample]) {
    for (o, p) in out.iter_mut().zip(phase.iter()) {
        *o = Sample::from_bits(interpolate824(table, *p));
    }
}

/// Read two tables at the same phase and blend them by `balance`
/// (0 is all `table_a`, [Scalar::MAX] is almost all `table_b`)
#[inline(always)]
pub fn crossfade(table_a: &Waveform, table_b: &Waveform, phase: u32, balance: Scalar) -> Sample {
    let a = I17F15::from_bits(interpolate824(table_a, phase) as i32);
    let b = I17F15::from_bits(interpolate824(table_b, phase) as i32);
    let step = (b - a).wide_mul_unsigned(U16F16::from_num(balance));
    Sample::from_num(a + I17F15::from_num(step))
}

/// Blend two samples: `a * (1 - balance) + b * balance`, where the weights
/// are taken from [Scalar::MAX] and so sum to slightly less than one.
///
/// Even a zero balance scales `a` by `0xffff / 0x10000`, which rounds
/// every non-zero sample down by one step.
#[inline(always)]
pub fn mix(a: Sample, b: Sample, balance: Scalar) -> Sample {
    let wide = a.wide_mul_unsigned(Scalar::MAX - balance) + b.wide_mul_unsigned(balance);
    Sample::from_num(wide)
}

/// Blend two 32 bit values (phases, increments, durations) by a 15 bit
/// parameter, with weights summing to [MAX_PARAM].  Negative balances are
/// treated as zero.
#[inline(always)]
pub fn mix_u32(a: u32, b: u32, balance: IScalar) -> u32 {
    let balance = U17F15::from_bits(balance.max(IScalar::ZERO).to_bits() as u32);
    let rest = U17F15::from_bits(MAX_PARAM as u32) - balance;
    let wide = U32F0::from_num(a).wide_mul(rest) + U32F0::from_num(b).wide_mul(balance);
    wide.to_num()
}

/// Saturate a wide accumulator to a [Sample]
#[inline(always)]
pub fn clip(a: I17F15) -> Sample {
    Sample::saturating_from_num(a)
}

/// Clamp to a parameter's `0..=MAX_PARAM` range
#[inline(always)]
pub fn clamp_param(a: I17F15) -> i16 {
    IScalar::saturating_from_num(a).max(IScalar::ZERO).to_bits()
}

/// Scale every sample of `buf` by the matching value in `modulation`,
/// saturating (only -1 times -1 can overflow)
pub fn modulate(buf: &mut [Sample], modulation: &[IScalar]) {
    for (s, m) in buf.iter_mut().zip(modulation.iter()) {
        *s = s.saturating_mul(*m);
    }
}

/// Convert a MIDI key number to a [Pitch]
pub const fn key_to_pitch(key: u8) -> Pitch {
    Pitch::from_bits((key as i16) << 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{ENV_LINEAR, SAWTOOTH, SINE};

    fn ramp() -> [i16; TABLE_SIZE] {
        let mut table = [0i16; TABLE_SIZE];
        for (i, v) in table.iter_mut().enumerate() {
            *v = (i as i16) * 100 - 12800;
        }
        table
    }

    fn s(bits: i16) -> Sample {
        Sample::from_bits(bits)
    }

    #[test]
    fn interpolation_truncates() {
        let table = ramp();
        assert_eq!(interpolate824(&table, 0), -12800);
        // halfway between entries 1 and 2
        assert_eq!(interpolate824(&table, (1 << 24) | (1 << 23)), -12650);
        // a fraction of 1/65536 of a step of 100 rounds down to nothing
        assert_eq!(interpolate824(&table, (3 << 24) | (1 << 8)), -12500);
        assert_eq!(interpolate824(&table, u32::MAX), 12799);
        assert_eq!(interpolate88(&table, 0x0180), -12650);
        assert_eq!(interpolate88(&table, 0xffff), 12799);
    }
    #[test]
    fn negative_slopes_floor() {
        let mut table = [0i16; TABLE_SIZE];
        table[1] = -3;
        // -3 * 0x8000 >> 16 is -1.5, which floors to -2
        assert_eq!(interpolate824(&table, 0x0080_0000), -2);
    }
    #[test]
    fn full_scale_jumps_do_not_wrap() {
        let mut table = [i16::MAX; TABLE_SIZE];
        for v in table[128..].iter_mut() {
            *v = -i16::MAX;
        }
        let phase = (127u32 << 24) | 0x00ff_ff00;
        let v = interpolate824(&table, phase);
        assert!(v <= -32765, "{}", v);
    }
    #[test]
    fn unsigned_tables() {
        assert_eq!(interpolate824(&ENV_LINEAR, 0), 0);
        assert_eq!(interpolate824(&ENV_LINEAR, u32::MAX), 65534);
        assert_eq!(interpolate88(&ENV_LINEAR, 0x8000), ENV_LINEAR[128]);
    }
    #[test]
    fn sine_quarter_cycle() {
        assert_eq!(interpolate824(&SINE, 1 << 30), i16::MAX);
        assert_eq!(interpolate824(&SINE, 3 << 30), -i16::MAX);
        let mut out = [Sample::ZERO; 2];
        interpolate824_buf(&SINE, &[0, 1 << 30], &mut out);
        assert_eq!(out, [Sample::ZERO, Sample::MAX]);
    }
    #[test]
    fn crossfade_endpoints() {
        let phase = 0x1234_5678;
        let sine = s(interpolate824(&SINE, phase));
        let saw = s(interpolate824(&SAWTOOTH, phase));
        assert_eq!(crossfade(&SINE, &SAWTOOTH, phase, Scalar::ZERO), sine);
        let almost_b = crossfade(&SINE, &SAWTOOTH, phase, Scalar::MAX);
        assert!((almost_b.to_bits() as i32 - saw.to_bits() as i32).abs() <= 1);
        // a + (b - a) * balance, floored
        let half = crossfade(&SINE, &SAWTOOTH, phase, Scalar::from_bits(0x8000));
        let expected = sine.to_bits() as i32 + ((saw.to_bits() as i32 - sine.to_bits() as i32) >> 1);
        assert_eq!(half.to_bits() as i32, expected);
    }
    #[test]
    fn mix_weights() {
        assert_eq!(mix(s(1000), s(-1000), Scalar::ZERO), s(999));
        assert_eq!(mix(s(i16::MIN), s(i16::MIN), Scalar::from_bits(12345)), s(i16::MIN));
        assert_eq!(mix(s(i16::MAX), s(i16::MAX), Scalar::from_bits(40000)), s(32766));
        assert_eq!(mix(s(0), s(i16::MAX), Scalar::MAX), s(32766));
        assert_eq!(mix_u32(100, 200, IScalar::ZERO), 99);
        assert_eq!(mix_u32(0, 1 << 20, IScalar::MAX), (1 << 20) - 32);
        assert_eq!(mix_u32(7, 9, IScalar::from_bits(-5)), mix_u32(7, 9, IScalar::ZERO));
        assert_eq!(mix_u32(u32::MAX, u32::MAX, IScalar::from_bits(77)), u32::MAX - (1 << 17));
    }
    #[test]
    fn zero_balance_only_attenuates() {
        // the second input has no influence at all
        for a in [i16::MIN, -1000, -1, 0, 1, 1000, i16::MAX] {
            let expected = s(((a as i32 * 65535) >> 16) as i16);
            assert_eq!(mix(s(a), s(i16::MAX), Scalar::ZERO), expected);
            assert_eq!(mix(s(a), s(i16::MIN), Scalar::ZERO), expected);
        }
        assert_eq!(mix(s(0), s(i16::MIN), Scalar::ZERO), Sample::ZERO);
        assert_eq!(mix(s(-1), s(5), Scalar::ZERO), s(-1));
    }
    #[test]
    fn saturation() {
        assert_eq!(clip(I17F15::from_bits(40000)), Sample::MAX);
        assert_eq!(clip(I17F15::from_bits(-40000)), Sample::MIN);
        assert_eq!(clip(I17F15::from_bits(-5)), s(-5));
        assert_eq!(clamp_param(I17F15::from_bits(-5)), 0);
        assert_eq!(clamp_param(I17F15::from_bits(40000)), MAX_PARAM);
        assert_eq!(clamp_param(I17F15::from_bits(1234)), 1234);
        let mut buf = [s(i16::MIN), s(1000), s(-7)];
        modulate(&mut buf, &[IScalar::MIN, IScalar::from_bits(16384), IScalar::from_bits(16384)]);
        // -7 / 2 floors to -4
        assert_eq!(buf, [Sample::MAX, s(500), s(-4)]);
    }
    #[test]
    fn pitch_of_key() {
        assert_eq!(key_to_pitch(69), Pitch::from_num(69));
        assert_eq!(key_to_pitch(60).to_bits(), 60 * 128);
    }
}
