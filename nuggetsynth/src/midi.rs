//! Byte-at-a-time MIDI decoding.
//!
//! [MidiDecoder] turns a raw serial byte stream into complete messages packed
//! into a single word (`status | data1 << 8 | data2 << 16`), which is also
//! how MIDI events travel across the [crate::transport].  Packed messages
//! convert to [wmidi::MidiMessage] for dispatch.

pub mod cc;

use arrayvec::ArrayVec;
use core::num::NonZeroU32;
use wmidi::MidiMessage;

const SYSEX_START: u8 = 0xF0;
const SONG_POSITION: u8 = 0xF2;
const SONG_SELECT: u8 = 0xF3;
const BUS_SELECT: u8 = 0xF5;
const TUNE_REQUEST: u8 = 0xF6;
const SYSEX_END: u8 = 0xF7;
const REALTIME_START: u8 = 0xF8;
const UNDEFINED_TICK: u8 = 0xF9;
const UNDEFINED_REALTIME: u8 = 0xFD;

/// The number of data bytes following `status`, or `None` if messages with
/// this status are not decoded
fn data_len(status: u8) -> Option<usize> {
    match status {
        0x80..=0xBF | SONG_POSITION => Some(2),
        0xC0..=0xEF | SONG_SELECT | BUS_SELECT => Some(1),
        TUNE_REQUEST | REALTIME_START..=0xFF => match status {
            UNDEFINED_TICK | UNDEFINED_REALTIME => None,
            _ => Some(0),
        },
        _ => None,
    }
}

/// A complete MIDI message of up to three bytes, packed little-endian into a
/// nonzero word.  A status byte always has its high bit set, so a valid
/// message is never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawMidi(NonZeroU32);

impl RawMidi {
    /// Wrap a packed word.  Returns `None` for zero, the "no message" value.
    pub fn new(word: u32) -> Option<Self> {
        NonZeroU32::new(word).map(Self)
    }
    /// Pack up to three bytes.  Returns `None` if there are more than three
    /// or they pack to zero.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > 3 {
            return None;
        }
        let word = bytes
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, b)| acc | (*b as u32) << (8 * i));
        Self::new(word)
    }
    /// Serialize a [wmidi::MidiMessage].  Returns `None` for messages that
    /// don't fit in three bytes (system exclusive).
    pub fn from_message(message: &MidiMessage) -> Option<Self> {
        let mut bytes = [0u8; 3];
        let len = message.copy_to_slice(&mut bytes).ok()?;
        Self::from_bytes(&bytes[..len])
    }
    /// The packed word
    pub fn as_u32(self) -> u32 {
        self.0.get()
    }
    /// The status byte
    pub fn status(self) -> u8 {
        self.0.get() as u8
    }
    /// All three bytes, in wire order.  Unused data bytes are zero.
    pub fn bytes(self) -> [u8; 3] {
        let [a, b, c, _] = self.0.get().to_le_bytes();
        [a, b, c]
    }
    /// The number of meaningful bytes, as implied by the status byte
    pub fn byte_count(self) -> usize {
        1 + data_len(self.status()).unwrap_or(0)
    }
    /// Convert to a [wmidi::MidiMessage] and pass it to `f`.  Errors if the
    /// bytes don't form a message wmidi understands.
    pub fn with_message<R>(
        self,
        f: impl FnOnce(MidiMessage) -> R,
    ) -> Result<R, wmidi::FromBytesError> {
        let bytes = self.bytes();
        let message = MidiMessage::try_from(&bytes[..self.byte_count()])?;
        Ok(f(message))
    }
}

/// A MIDI byte-stream decoder.
///
/// Feed it one byte at a time with [MidiDecoder::push]; each call is constant
/// time.  Running status is not supported: every message needs its own
/// status byte.  Bytes that can't be part of a complete message are dropped,
/// and decoding resynchronizes on the next status byte.
#[derive(Clone, Default, Debug)]
pub struct MidiDecoder {
    bytes: ArrayVec<u8, 3>,
    remaining: usize,
}

impl MidiDecoder {
    /// Constructor
    pub fn new() -> Self {
        Default::default()
    }
    /// True while a message has been started but not completed
    pub fn awaiting_data(&self) -> bool {
        self.remaining > 0
    }
    /// Discard any partial message
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.remaining = 0;
    }
    /// Consume one byte, returning a message if it completed one.
    ///
    /// Real-time bytes and tune request are complete on their own and may be
    /// interleaved anywhere, even mid-message; they leave a partial message
    /// untouched.
    pub fn push(&mut self, byte: u8) -> Option<RawMidi> {
        if byte >= REALTIME_START || byte == TUNE_REQUEST {
            if data_len(byte).is_none() {
                log::debug!("ignoring undefined MIDI byte {:#04x}", byte);
                return None;
            }
            return RawMidi::new(byte as u32);
        }
        if byte & 0x80 != 0 {
            self.reset();
            return match data_len(byte) {
                Some(len) if len > 0 => {
                    self.bytes.push(byte);
                    self.remaining = len;
                    None
                }
                _ => {
                    if byte != SYSEX_START && byte != SYSEX_END {
                        log::debug!("ignoring MIDI status {:#04x}", byte);
                    }
                    None
                }
            };
        }
        if self.remaining == 0 {
            return None;
        }
        self.bytes.push(byte);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        let message = RawMidi::from_bytes(&self.bytes);
        self.reset();
        message
    }
}
