//! Lookup tables used by the DSP code.
//!
//! Every table here is generated at compile time by a `const fn`, so nothing
//! is computed at startup and all tables live in flash on embedded targets.
//! Waveform and curve tables have 257 entries so that linear interpolation
//! can always read `table[index + 1]` without a bounds special case.
//!
//! Tables that depend on the sample rate are grouped in [SampleRateTables];
//! one instance exists per supported [crate::context::FixedSampleRate].

use core::f64::consts::{LN_2, PI};

/// Number of entries in waveform and curve tables
pub const TABLE_SIZE: usize = 257;

/// A single-cycle signed waveform
pub type Waveform = [i16; TABLE_SIZE];

/// An unsigned 0..=65535 curve (envelope shapes, detune)
pub type Curve = [u16; TABLE_SIZE];

/// Number of entries in the oscillator phase increment table
pub const OSC_INCREMENTS_SIZE: usize = 97;

/// Number of entries in each envelope increment table
pub const ENV_INCREMENTS_SIZE: usize = 128;

/// Number of supported envelope segment time ranges
pub const NUM_TIME_RANGES: usize = 6;

/// The full excursion of a 32-bit phase accumulator
const EXCURSION: f64 = 4294967296f64;

// The functions below are helpers because the ones in std are not const
// evaluable on stable.  They only need to be accurate enough to generate
// 16-bit tables.

const fn f_abs(x: f64) -> f64 {
    if x < 0f64 {
        -x
    } else {
        x
    }
}

const fn round(x: f64) -> i64 {
    if x < 0f64 {
        (x - 0.5) as i64
    } else {
        (x + 0.5) as i64
    }
}

const fn f_min(a: f64, b: f64) -> f64 {
    if a < b {
        a
    } else {
        b
    }
}

// e^x, range reduced to |r| <= ln(2)/2 and scaled back by powers of two
const fn exp(x: f64) -> f64 {
    let mut k = round(x / LN_2);
    let r = x - (k as f64) * LN_2;
    let mut term = 1f64;
    let mut acc = 1f64;
    let mut n = 1u32;
    while n < 24 {
        term = term * r / (n as f64);
        acc += term;
        n += 1;
    }
    while k > 0 {
        acc *= 2f64;
        k -= 1;
    }
    while k < 0 {
        acc /= 2f64;
        k += 1;
    }
    acc
}

// ln(x) for x > 0, via the atanh series on a mantissa in [0.75, 1.5]
const fn ln(x: f64) -> f64 {
    let mut m = x;
    let mut k = 0i32;
    while m > 1.5 {
        m /= 2f64;
        k += 1;
    }
    while m < 0.75 {
        m *= 2f64;
        k -= 1;
    }
    let y = (m - 1f64) / (m + 1f64);
    let y2 = y * y;
    let mut term = y;
    let mut acc = 0f64;
    let mut n = 1u32;
    while n < 61 {
        acc += term / (n as f64);
        term *= y2;
        n += 2;
    }
    2f64 * acc + (k as f64) * LN_2
}

const fn pow(x: f64, y: f64) -> f64 {
    if x <= 0f64 {
        0f64
    } else {
        exp(y * ln(x))
    }
}

const fn exp2(x: f64) -> f64 {
    exp(x * LN_2)
}

const fn log2(x: f64) -> f64 {
    ln(x) / LN_2
}

const fn sin(x: f64) -> f64 {
    const DELTA: f64 = 1e-12;
    let turns = round(x / (2f64 * PI));
    let r = x - (turns as f64) * 2f64 * PI;
    let mut term = r;
    let mut acc = r;
    let mut n = 1u32;
    while f_abs(term) > DELTA {
        let k = (2 * n) as f64;
        term = -term * r * r / (k * (k + 1f64));
        acc += term;
        n += 1;
    }
    acc
}

const fn to_i16(x: f64) -> i16 {
    let v = round(x * 32767f64);
    if v > i16::MAX as i64 {
        i16::MAX
    } else if v < -(i16::MAX as i64) {
        -i16::MAX
    } else {
        v as i16
    }
}

const fn to_u16(x: f64) -> u16 {
    let v = round(x * 65535f64);
    if v > u16::MAX as i64 {
        u16::MAX
    } else if v < 0 {
        0
    } else {
        v as u16
    }
}

/// Generate a waveform from a function of the phase `x` in `[0, 1]`.
/// Done with a selector instead of a function pointer because the latter
/// cannot be called in const context.
const fn waveform(kind: WaveKind) -> Waveform {
    let mut table = [0i16; TABLE_SIZE];
    let mut i = 0usize;
    while i < TABLE_SIZE {
        let x = (i as f64) / 256f64;
        table[i] = to_i16(wave_value(kind, x));
        i += 1;
    }
    table
}

#[derive(Clone, Copy)]
enum WaveKind {
    Sine,
    Triangle,
    Sawtooth,
    SquareSin,
    SquareFullSin,
    TrigSin,
    TrigFullSin,
    SinSquare,
    Warp(f64),
}

const fn triangle(x: f64) -> f64 {
    if x < 0.25 {
        4f64 * x
    } else if x < 0.75 {
        2f64 - 4f64 * x
    } else {
        4f64 * x - 4f64
    }
}

const fn wave_value(kind: WaveKind, x: f64) -> f64 {
    let sine = sin(2f64 * PI * x);
    match kind {
        WaveKind::Sine => sine,
        WaveKind::Triangle => triangle(x),
        WaveKind::Sawtooth => 2f64 * x - 1f64,
        // first half is a flat top, second half is the negative sine lobe
        WaveKind::SquareSin => {
            if x < 0.5 {
                1f64
            } else {
                sine
            }
        }
        // first half is a flat top, second half holds one whole sine cycle
        WaveKind::SquareFullSin => {
            if x < 0.5 {
                1f64
            } else {
                sin(4f64 * PI * (x - 0.5))
            }
        }
        WaveKind::TrigSin => {
            if x < 0.5 {
                1f64 - f_abs(4f64 * x - 1f64)
            } else {
                sine
            }
        }
        WaveKind::TrigFullSin => {
            if x < 0.5 {
                1f64 - f_abs(4f64 * x - 1f64)
            } else {
                sin(4f64 * PI * (x - 0.5))
            }
        }
        WaveKind::SinSquare => {
            if x < 0.5 {
                sine
            } else {
                -1f64
            }
        }
        // monotonic phase warp x - s*sin(2 pi x)/(2 pi), stored as a signed
        // value so that -1.0 maps to phase 0 and +1.0 to the end of the cycle
        WaveKind::Warp(s) => 2f64 * (x - s * sine / (2f64 * PI)) - 1f64,
    }
}

/// A sine wave
pub static SINE: Waveform = waveform(WaveKind::Sine);
/// A triangle wave, starting at zero and rising
pub static TRIANGLE: Waveform = waveform(WaveKind::Triangle);
/// A rising sawtooth
pub static SAWTOOTH: Waveform = waveform(WaveKind::Sawtooth);
/// Square top followed by the negative sine lobe
pub static SQUARE_SIN: Waveform = waveform(WaveKind::SquareSin);
/// Square top followed by a full sine cycle in the second half
pub static SQUARE_FULL_SIN: Waveform = waveform(WaveKind::SquareFullSin);
/// Triangle lobe followed by the negative sine lobe
pub static TRIANGLE_SIN: Waveform = waveform(WaveKind::TrigSin);
/// Triangle lobe followed by a full sine cycle in the second half
pub static TRIANGLE_FULL_SIN: Waveform = waveform(WaveKind::TrigFullSin);
/// Positive sine lobe followed by a flat bottom
pub static SIN_SQUARE: Waveform = waveform(WaveKind::SinSquare);

/// Gentle phase warp, for [crate::devices::PhaseDistortionLookupOscillator]
pub static PHASE_WARP_1: Waveform = waveform(WaveKind::Warp(0.5));
/// Stronger phase warp
pub static PHASE_WARP_2: Waveform = waveform(WaveKind::Warp(0.8));
/// Strongest phase warp (the warp has zero slope at the cycle edges)
pub static PHASE_WARP_3: Waveform = waveform(WaveKind::Warp(1.0));

const fn env_curve(kind: u8) -> Curve {
    let mut table = [0u16; TABLE_SIZE];
    let mut i = 0usize;
    while i < TABLE_SIZE {
        let x = (i as f64) / 256f64;
        let y = match kind {
            0 => x,
            1 => (exp(5f64 * x) - 1f64) / (exp(5f64) - 1f64),
            _ => (1f64 - exp(-4f64 * x)) / (1f64 - exp(-4f64)),
        };
        table[i] = to_u16(y);
        i += 1;
    }
    table
}

/// A straight ramp from 0 to 65535
pub static ENV_LINEAR: Curve = env_curve(0);
/// Slow start, fast finish: a normalized `e^(5x)`
pub static ENV_SLOW_START: Curve = env_curve(1);
/// Fast start, slow finish: a normalized `1 - e^(-4x)` (RC charge shape)
pub static ENV_FAST_START: Curve = env_curve(2);

const fn vco_detune() -> Curve {
    let mut pitches = [0f64; TABLE_SIZE];
    let mut i = 0usize;
    while i < TABLE_SIZE {
        let mut frequency = 440f64 * exp2(((i as f64) / 2f64 - 69f64) / 12f64);
        // offset current in the integrator
        frequency -= 0.6;
        // integrator cap reset time
        frequency = 1f64 / (1f64 / frequency + 9e-6);
        let pitch = 128f64 * (69f64 + 12f64 * log2(frequency / 440f64));
        pitches[i] = if pitch < 0f64 { 0f64 } else { pitch };
        i += 1;
    }
    let offset = (60 << 7) as f64 - pitches[120];
    let mut table = [0u16; TABLE_SIZE];
    let mut i = 0usize;
    while i < TABLE_SIZE {
        let v = round(pitches[i] + offset);
        table[i] = if v < 0 {
            0
        } else if v > u16::MAX as i64 {
            u16::MAX
        } else {
            v as u16
        };
        i += 1;
    }
    table
}

/// Maps `pitch << 2` to a slightly flattened pitch, imitating the tracking
/// error of an analog VCO
pub static VCO_DETUNE: Curve = vco_detune();

/// Lookup tables that depend on the processing sample rate
pub struct SampleRateTables {
    /// Phase increments from MIDI note 128 to 140 in steps of 1/8 semitone
    pub oscillator_increments: [u32; OSC_INCREMENTS_SIZE],
    /// Envelope phase increments, one table per [crate::devices::SegmentTime]
    pub env_increments: [[u32; ENV_INCREMENTS_SIZE]; NUM_TIME_RANGES],
    /// SVF integrator gain, indexed by MIDI note
    pub svf_cutoff: Curve,
    /// SVF damping, indexed by resonance
    pub svf_damp: Curve,
}

impl SampleRateTables {
    const fn generate(sample_rate: u32) -> Self {
        let sr = sample_rate as f64;
        Self {
            oscillator_increments: Self::oscillator_increments(sr),
            env_increments: [
                Self::env_increments(sr, 10f64),
                Self::env_increments(sr, 5f64),
                Self::env_increments(sr, 2f64),
                Self::env_increments(sr, 1f64),
                Self::env_increments(sr, 0.5),
                Self::env_increments(sr, 0.25),
            ],
            svf_cutoff: Self::svf(sr, true),
            svf_damp: Self::svf(sr, false),
        }
    }
    const fn oscillator_increments(sr: f64) -> [u32; OSC_INCREMENTS_SIZE] {
        let mut table = [0u32; OSC_INCREMENTS_SIZE];
        let mut i = 0usize;
        while i < OSC_INCREMENTS_SIZE {
            let note = (128 * 128 + 16 * i) as f64;
            let pitch = 440f64 * exp2((note - 69f64 * 128f64) / 1536f64);
            table[i] = (EXCURSION / sr * pitch) as u32;
            i += 1;
        }
        table
    }
    // Increments spaced evenly in `increment^-gamma`, from a 3-sample ramp
    // down to one lasting `max_time` seconds
    const fn env_increments(sr: f64, max_time: f64) -> [u32; ENV_INCREMENTS_SIZE] {
        const GAMMA: f64 = 0.7;
        let min_time = 3f64 / sr;
        let min_increment = EXCURSION / (max_time * sr);
        let max_increment = EXCURSION / (min_time * sr);
        let start = pow(max_increment, -GAMMA);
        let end = pow(min_increment, -GAMMA);
        let mut table = [0u32; ENV_INCREMENTS_SIZE];
        let mut i = 0usize;
        while i < ENV_INCREMENTS_SIZE {
            let rate = start + (end - start) * (i as f64) / ((ENV_INCREMENTS_SIZE - 1) as f64);
            table[i] = pow(rate, -1f64 / GAMMA) as u32;
            i += 1;
        }
        table
    }
    const fn svf(sr: f64, cutoff: bool) -> Curve {
        let mut table = [0u16; TABLE_SIZE];
        let mut i = 0usize;
        while i < TABLE_SIZE {
            let freq = 440f64 * exp2(((i as f64) - 69f64) / 12f64);
            let f = 2f64 * sin(PI * f_min(freq / sr, 0.125));
            let value = if cutoff {
                f
            } else {
                let resonance = (i as f64) / 260f64;
                f_min(
                    2f64 * (1f64 - pow(resonance, 0.25)),
                    f_min(2f64, 2f64 / f - f * 0.5),
                )
            };
            let v = round(value * 32767f64);
            table[i] = if v < 0 {
                0
            } else if v > u16::MAX as i64 {
                u16::MAX
            } else {
                v as u16
            };
            i += 1;
        }
        table
    }
}

/// Tables for a 32kHz sample rate
pub static TABLES_32K: SampleRateTables = SampleRateTables::generate(32000);
/// Tables for a 44.1kHz sample rate
pub static TABLES_44K1: SampleRateTables = SampleRateTables::generate(44100);
/// Tables for a 48kHz sample rate
pub static TABLES_48K: SampleRateTables = SampleRateTables::generate(48000);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_math_accuracy() {
        assert!(f_abs(exp(1f64) - core::f64::consts::E) < 1e-9);
        assert!(f_abs(ln(10f64) - core::f64::consts::LN_10) < 1e-9);
        assert!(f_abs(sin(PI / 6f64) - 0.5) < 1e-9);
        assert!(f_abs(pow(2f64, 0.5) - core::f64::consts::SQRT_2) < 1e-9);
    }
    #[test]
    fn waveform_endpoints() {
        assert_eq!(SINE[0], 0);
        assert_eq!(SINE[64], i16::MAX);
        assert_eq!(SINE[192], -i16::MAX);
        assert_eq!(SINE[256], 0);
        assert_eq!(SAWTOOTH[0], -i16::MAX);
        assert_eq!(SAWTOOTH[256], i16::MAX);
        assert_eq!(TRIANGLE[64], i16::MAX);
        assert_eq!(SQUARE_SIN[10], i16::MAX);
        assert_eq!(SIN_SQUARE[200], -i16::MAX);
    }
    #[test]
    fn phase_warps_are_monotonic() {
        for table in [&PHASE_WARP_1, &PHASE_WARP_2, &PHASE_WARP_3] {
            assert_eq!(table[0], -i16::MAX);
            assert_eq!(table[256], i16::MAX);
            assert!(table.windows(2).all(|w| w[0] <= w[1]));
        }
    }
    #[test]
    fn env_curves_span_full_range() {
        for curve in [&ENV_LINEAR, &ENV_SLOW_START, &ENV_FAST_START] {
            assert_eq!(curve[0], 0);
            assert_eq!(curve[256], u16::MAX);
            assert!(curve.windows(2).all(|w| w[0] <= w[1]));
        }
        assert!(ENV_SLOW_START[128] < ENV_LINEAR[128]);
        assert!(ENV_FAST_START[128] > ENV_LINEAR[128]);
    }
    #[test]
    fn oscillator_increments_double_per_octave() {
        let table = &TABLES_44K1.oscillator_increments;
        // 96 entries of 16 pitch units is exactly one octave
        let ratio = table[96] as f64 / table[0] as f64;
        assert!(f_abs(ratio - 2f64) < 1e-6);
        // note 128 at 44.1kHz is ~13289.75Hz
        let expected = EXCURSION / 44100f64 * 440f64 * exp2((128f64 - 69f64) / 12f64);
        assert!(f_abs(table[0] as f64 - expected) <= 1f64);
    }
    #[test]
    fn env_increments_run_fast_to_slow() {
        for table in TABLES_48K.env_increments.iter() {
            assert!(table.windows(2).all(|w| w[0] >= w[1]));
            // the fastest segment lasts about 3 samples
            assert!(table[0] > u32::MAX / 4);
        }
        // a 10 second ramp at 48kHz
        let slowest = TABLES_48K.env_increments[0][127] as f64;
        assert!(f_abs(slowest - EXCURSION / 480000f64) < 2f64);
    }
    #[test]
    fn vco_detune_is_anchored_at_middle_c() {
        assert_eq!(VCO_DETUNE[120], 60 << 7);
        assert!(VCO_DETUNE.windows(2).all(|w| w[0] <= w[1]));
    }
    #[test]
    fn svf_coefficients_are_bounded() {
        for tables in [&TABLES_32K, &TABLES_44K1, &TABLES_48K] {
            assert!(tables.svf_cutoff.windows(2).all(|w| w[0] <= w[1]));
            assert!(tables.svf_cutoff[256] <= 25080);
            assert!(tables.svf_damp[0] > tables.svf_damp[255]);
        }
    }
}
