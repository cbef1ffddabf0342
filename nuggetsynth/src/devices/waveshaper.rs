use rand::{rngs::SmallRng, RngCore, SeedableRng};

use crate::fixedmath::{interpolate88, Sample};
use crate::tables::{Waveform, TABLE_SIZE};

/// A per-voice "signature": a fixed, slightly irregular transfer curve that
/// gives each voice its own subtle distortion, like component tolerances in
/// an analog circuit.
///
/// The curve is generated once from a seed, is strictly increasing, and maps
/// the full sample range onto itself.
#[derive(Clone)]
pub struct SignatureWaveshaper {
    transfer: Waveform,
}

impl SignatureWaveshaper {
    /// Build the transfer curve for `seed`
    pub fn new(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut steps = [0u32; TABLE_SIZE - 1];
        for step in steps.iter_mut() {
            // between a quarter and twice the nominal slope
            *step = 64 + (rng.next_u32() % 448);
        }
        let total: u64 = steps.iter().map(|s| *s as u64).sum();
        let mut transfer = [0i16; TABLE_SIZE];
        let mut acc = 0u64;
        transfer[0] = i16::MIN;
        for (i, step) in steps.iter().enumerate() {
            acc += *step as u64;
            transfer[i + 1] = (i16::MIN as i64 + (acc * u16::MAX as u64 / total) as i64) as i16;
        }
        Self { transfer }
    }
    /// Apply the transfer curve to one sample
    pub fn transform(&self, sample: Sample) -> Sample {
        // offset binary: -1.0 reads the first entry
        let index = (sample.to_bits() as u16) ^ 0x8000;
        Sample::from_bits(interpolate88(&self.transfer, index))
    }
}
