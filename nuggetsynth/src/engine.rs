//! The render engine: every voice and channel the synth has, and the code
//! that turns them into packed output frames.
//!
//! Voices are bound to channels when the engine is built.  The first
//! `poly_voices` voices all belong to channel 0, which hands out notes in
//! strict round-robin order.  Every other channel owns exactly one voice.

mod channel;
mod mix;
mod voice;

pub use channel::{
    ChannelParams, BIT_REDUCTION_MASKS, DECIMATION_FACTORS, MAX_SIGNATURE, NUM_DECIMATIONS,
    NUM_RESOLUTIONS,
};
pub use mix::{pan_gains, volume_gain, Encoding, MixBus, OutputFormat, StereoMode};
pub use voice::Voice;

use arrayvec::ArrayVec;
use wmidi::{ControlFunction, MidiMessage};

use crate::context::Context;
use crate::midi::RawMidi;
use crate::{Error, Sample, BLOCK_SIZE, MAX_CHANNELS, MAX_VOICES};

/// Engine settings, fixed for the lifetime of an [Engine]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Voices shared round-robin by channel 0
    pub poly_voices: usize,
    /// Number of channels, including the polyphonic one
    pub channels: usize,
    /// The Control Change value that maps to the top of a parameter's range
    pub cc_max: u8,
    /// Added to every voice's pitch, in pitch units (tuning)
    pub pitch_offset: i16,
    /// Length of a glide at the maximum glide setting
    pub max_glide_ms: u32,
    /// Layout of the packed output frames
    pub output: OutputFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poly_voices: 4,
            channels: 2,
            cc_max: 15,
            pitch_offset: 0,
            max_glide_ms: 1000,
            output: OutputFormat::default(),
        }
    }
}

impl EngineConfig {
    /// The total number of voices this configuration needs
    pub fn num_voices(&self) -> usize {
        self.poly_voices + self.channels.saturating_sub(1)
    }
    /// Check that the configuration fits in the engine's fixed pools
    pub fn validate(&self) -> Result<(), Error> {
        if self.poly_voices == 0 {
            return Err(Error::InvalidConfig("need at least one polyphonic voice"));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(Error::InvalidConfig("channel count out of range"));
        }
        if self.num_voices() > MAX_VOICES {
            return Err(Error::InvalidConfig("too many voices"));
        }
        if self.cc_max == 0 || self.cc_max > 127 {
            return Err(Error::InvalidConfig("cc_max must be 1 to 127"));
        }
        if !(1..=16).contains(&self.output.resolution_bits) {
            return Err(Error::InvalidConfig("output resolution must be 1 to 16 bits"));
        }
        Ok(())
    }
}

/// The channel voice `voice` is bound to
fn channel_of(voice: usize, poly_voices: usize) -> usize {
    if voice < poly_voices {
        0
    } else {
        voice - poly_voices + 1
    }
}

/// Owns all per-voice and per-channel state and renders output blocks.
///
/// Nothing here allocates or blocks, so an `Engine` can live on the render
/// core and be driven straight from its receive loop.
pub struct Engine {
    context: Context,
    config: EngineConfig,
    voices: ArrayVec<Voice, MAX_VOICES>,
    channels: ArrayVec<ChannelParams, MAX_CHANNELS>,
    round_robin: usize,
}

impl Engine {
    /// Build an engine with every voice silent and every channel at its
    /// default settings
    pub fn new(context: Context, config: EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        let voices = (0..config.num_voices())
            .map(|i| Voice::new(&context, 42000 * (i as u64 + 1), config.max_glide_ms))
            .collect();
        let channels = (0..config.channels).map(|_| ChannelParams::default()).collect();
        Ok(Self {
            context,
            config,
            voices,
            channels,
            round_robin: 0,
        })
    }
    /// The processing context
    pub fn context(&self) -> &Context {
        &self.context
    }
    /// The configuration this engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
    /// A voice, by index
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }
    /// A channel's parameters
    pub fn channel(&self, channel: usize) -> Option<&ChannelParams> {
        self.channels.get(channel)
    }
    /// A channel's parameters, for direct modification
    pub fn channel_mut(&mut self, channel: usize) -> Option<&mut ChannelParams> {
        self.channels.get_mut(channel)
    }
    /// Start a note.  Returns the voice it was assigned to, or `None` if the
    /// channel doesn't exist or the velocity is zero (which releases `key`
    /// instead).
    pub fn note_on(&mut self, channel: usize, key: u8, velocity: u8) -> Option<usize> {
        if velocity == 0 {
            self.note_off(channel, key);
            return None;
        }
        let index = self.voice_for(channel)?;
        self.voices[index].note_on(key, velocity);
        Some(index)
    }
    /// Release `key` on every voice of `channel` still playing it.  The
    /// round-robin order is not affected.
    pub fn note_off(&mut self, channel: usize, key: u8) {
        let poly = self.config.poly_voices;
        for (i, voice) in self.voices.iter_mut().enumerate() {
            if channel_of(i, poly) == channel {
                voice.note_off(key);
            }
        }
    }
    /// Apply a Control Change to `channel`.  Returns false if the channel
    /// doesn't exist or the control is not mapped.
    pub fn control_change(&mut self, channel: usize, function: ControlFunction, value: u8) -> bool {
        let cc_max = self.config.cc_max;
        self.channels
            .get_mut(channel)
            .is_some_and(|params| params.control_change(function, value, cc_max))
    }
    /// Dispatch a decoded MIDI event
    pub fn handle_midi(&mut self, raw: RawMidi) {
        let handled = raw.with_message(|message| match message {
            MidiMessage::NoteOn(ch, note, velocity) => {
                self.note_on(ch.index() as usize, note.into(), velocity.into());
                true
            }
            MidiMessage::NoteOff(ch, note, _) => {
                self.note_off(ch.index() as usize, note.into());
                true
            }
            MidiMessage::ControlChange(ch, function, value) => {
                self.control_change(ch.index() as usize, function, value.into())
            }
            _ => false,
        });
        match handled {
            Ok(true) => {}
            Ok(false) => log::debug!("ignoring MIDI message {:#08x}", raw.as_u32()),
            Err(e) => log::debug!("undecodable MIDI message {:#08x}: {:?}", raw.as_u32(), e),
        }
    }
    /// Render and pack `out.len()` frames
    pub fn render(&mut self, out: &mut [u32]) {
        let poly = self.config.poly_voices;
        let format = self.config.output;
        let mut block = [Sample::ZERO; BLOCK_SIZE];
        for frames in out.chunks_mut(BLOCK_SIZE) {
            let block = &mut block[..frames.len()];
            let mut bus = MixBus::new();
            for (i, voice) in self.voices.iter_mut().enumerate() {
                let params = &self.channels[channel_of(i, poly)];
                voice.render(&self.context, params, self.config.pitch_offset, block);
                let (left, right) = match format.stereo {
                    StereoMode::Mono => (volume_gain(params.volume), volume_gain(params.volume)),
                    StereoMode::Discrete => pan_gains(params.volume, params.pan),
                };
                bus.add(block, left, right);
            }
            bus.write(&format, frames);
        }
    }
    fn voice_for(&mut self, channel: usize) -> Option<usize> {
        let poly = self.config.poly_voices;
        match channel {
            0 => {
                let index = self.round_robin;
                self.round_robin = (self.round_robin + 1) % poly;
                Some(index)
            }
            c if c < self.config.channels => Some(poly + c - 1),
            _ => None,
        }
    }
}
