//! This module provides objects to reason about the processing context.
//! Currently, the only information wrapped is the current audio sample rate,
//! which also selects the set of rate-dependent lookup tables.

use crate::tables::{SampleRateTables, TABLES_32K, TABLES_44K1, TABLES_48K};
use crate::Error;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
/// A fixed-point processing context.  Only a handful of sample rates are
/// supported, as the phase increment, envelope and filter tables are generated
/// at compile time for each of them.
pub struct Context {
    /// The sample rate, as one of the supported FixedSampleRates:
    pub sample_rate: FixedSampleRate,
}

impl Context {
    /// Create a new context with a sample rate of 44.1kHz
    pub const fn new_441() -> Self {
        Self {
            sample_rate: FixedSampleRate::Khz44_1,
        }
    }
    /// Create a new context with a sample rate of 48kHz
    pub const fn new_480() -> Self {
        Self {
            sample_rate: FixedSampleRate::Khz48_0,
        }
    }
    /// The sample rate of this context, in Hz
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate.value()
    }
    /// The lookup tables generated for this context's sample rate
    pub fn tables(&self) -> &'static SampleRateTables {
        match self.sample_rate {
            FixedSampleRate::Khz32_0 => &TABLES_32K,
            FixedSampleRate::Khz44_1 => &TABLES_44K1,
            FixedSampleRate::Khz48_0 => &TABLES_48K,
        }
    }
}

impl TryFrom<u32> for Context {
    type Error = Error;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(Self {
            sample_rate: FixedSampleRate::try_from(value)?,
        })
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
/// An enum representing all of the supported sample rates
pub enum FixedSampleRate {
    /// 32kHz sample rate
    Khz32_0,
    /// 44.1kHz sample rate
    #[default]
    Khz44_1,
    /// 48kHz sample rate
    Khz48_0,
}

impl FixedSampleRate {
    /// Converts this sample rate to a u32
    pub const fn value(&self) -> u32 {
        match self {
            Self::Khz32_0 => 32000,
            Self::Khz44_1 => 44100,
            Self::Khz48_0 => 48000,
        }
    }
}

impl TryFrom<u32> for FixedSampleRate {
    type Error = Error;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            32000 => Ok(Self::Khz32_0),
            44100 => Ok(Self::Khz44_1),
            48000 => Ok(Self::Khz48_0),
            _ => Err(Error::UnsupportedSampleRate(value)),
        }
    }
}
