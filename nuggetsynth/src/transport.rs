//! Cross-core messaging.
//!
//! The two cores exchange 32 bit words over a pair of hardware FIFOs (one per
//! direction).  Each word is a [Message]: either a buffer changing hands or a
//! packed MIDI event.  The words carry only buffer ids; the audio itself
//! stays in a shared [BufferPool], whose ownership tags make sure only the
//! side a buffer was last handed to can touch it.
//!
//! Wire format: bits 3:0 hold the kind.  Kind 1 (release) and kind 2
//! (grant) carry the buffer id in bits 11:4.  Kind 3 (MIDI) carries the
//! packed MIDI bytes in bits 31:8, with bits 7:4 zero.  Unused bits are zero.

#[cfg(any(test, feature = "std"))]
pub mod loopback;
mod pool;

pub use pool::{BufferPool, BufferToken, Side};

use crate::midi::RawMidi;
use crate::Error;

const KIND_MASK: u32 = 0xF;
const KIND_RELEASE: u8 = 1;
const KIND_GRANT: u8 = 2;
const KIND_MIDI: u8 = 3;

/// Which way a buffer is travelling
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Handed to the render side to be filled
    Grant,
    /// Handed back to the control side, full of audio
    Release,
}

/// A single transport word
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    /// Ownership of buffer `id` moves in `direction`
    Buffer {
        /// Which way the buffer is going
        direction: Direction,
        /// The buffer's index in the [BufferPool]
        id: u8,
    },
    /// A MIDI event for the render side
    Midi(RawMidi),
}

impl Message {
    /// Shorthand for a grant of buffer `id`
    pub const fn grant(id: u8) -> Self {
        Self::Buffer {
            direction: Direction::Grant,
            id,
        }
    }
    /// Shorthand for a release of buffer `id`
    pub const fn release(id: u8) -> Self {
        Self::Buffer {
            direction: Direction::Release,
            id,
        }
    }
    /// Pack into a transport word
    pub fn encode(self) -> u32 {
        match self {
            Self::Buffer { direction, id } => {
                let kind = match direction {
                    Direction::Grant => KIND_GRANT,
                    Direction::Release => KIND_RELEASE,
                };
                kind as u32 | (id as u32) << 4
            }
            Self::Midi(raw) => KIND_MIDI as u32 | raw.as_u32() << 8,
        }
    }
}

impl TryFrom<u32> for Message {
    type Error = Error;
    fn try_from(word: u32) -> Result<Self, Error> {
        let kind = (word & KIND_MASK) as u8;
        let id = (word >> 4) as u8;
        match kind {
            KIND_GRANT => Ok(Self::grant(id)),
            KIND_RELEASE => Ok(Self::release(id)),
            KIND_MIDI => RawMidi::new(word >> 8)
                .map(Self::Midi)
                .ok_or(Error::EmptyMidi),
            _ => Err(Error::UnknownKind(kind)),
        }
    }
}

/// One core's end of a bidirectional hardware word FIFO
pub trait Fifo {
    /// Push a word to the other core, waiting for space if necessary
    fn push_blocking(&mut self, word: u32);
    /// Push a word to the other core if there is space.  Returns false (and
    /// drops nothing) if the FIFO is full.
    fn try_push(&mut self, word: u32) -> bool;
    /// Wait for a word from the other core
    fn pop_blocking(&mut self) -> u32;
    /// Take a word from the other core, if one is waiting
    fn try_pop(&mut self) -> Option<u32>;
}

/// Typed messaging over a [Fifo].
///
/// Words that don't decode are logged and dropped; they never surface to the
/// caller and never stop a receive.
pub struct Transport<F: Fifo> {
    fifo: F,
}

impl<F: Fifo> Transport<F> {
    /// Constructor
    pub fn new(fifo: F) -> Self {
        Self { fifo }
    }
    /// Send a message, blocking while the FIFO is full
    pub fn send(&mut self, message: Message) {
        self.fifo.push_blocking(message.encode());
    }
    /// Send a message if there is room.  Returns false if the FIFO is full.
    pub fn try_send(&mut self, message: Message) -> bool {
        self.fifo.try_push(message.encode())
    }
    /// Wait for the next valid message
    pub fn receive(&mut self) -> Message {
        loop {
            if let Some(message) = Self::decode(self.fifo.pop_blocking()) {
                return message;
            }
        }
    }
    /// Return the next valid message, if any is waiting
    pub fn try_receive(&mut self) -> Option<Message> {
        loop {
            let word = self.fifo.try_pop()?;
            if let Some(message) = Self::decode(word) {
                return Some(message);
            }
        }
    }
    fn decode(word: u32) -> Option<Message> {
        match Message::try_from(word) {
            Ok(message) => Some(message),
            Err(e) => {
                log::warn!("dropping transport word {:#010x}: {}", word, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::loopback;
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(Message::grant(200).encode(), 0xC82);
        assert_eq!(Message::release(0).encode(), 1);
        assert_eq!(Message::try_from(0xC82), Ok(Message::grant(200)));
        assert_eq!(Message::try_from(0xFF1), Ok(Message::release(255)));
        let midi = RawMidi::from_bytes(&[0x90, 60, 127]).unwrap();
        assert_eq!(Message::Midi(midi).encode(), 0x7F3C_9003);
        assert_eq!(Message::try_from(0x7F3C_9003), Ok(Message::Midi(midi)));
    }
    #[test]
    fn bad_words() {
        assert_eq!(Message::try_from(0), Err(Error::UnknownKind(0)));
        assert_eq!(Message::try_from(0x1234_5674), Err(Error::UnknownKind(4)));
        assert_eq!(Message::try_from(3), Err(Error::EmptyMidi));
    }
    #[test]
    fn every_id_round_trips() {
        for id in 0..=255u8 {
            for msg in [Message::grant(id), Message::release(id)] {
                assert_eq!(Message::try_from(msg.encode()), Ok(msg));
            }
        }
    }
    #[test]
    fn unknown_words_are_skipped() {
        let (mut a, b) = loopback::pair();
        let mut rx = Transport::new(b);
        a.push_blocking(0xF);
        a.push_blocking(Message::grant(7).encode());
        a.push_blocking(9);
        assert_eq!(rx.receive(), Message::grant(7));
        assert_eq!(rx.try_receive(), None);
    }
    #[test]
    fn order_is_preserved() {
        let (a, b) = loopback::pair();
        let mut tx = Transport::new(a);
        let mut rx = Transport::new(b);
        for id in 0..5 {
            tx.send(Message::release(id));
        }
        for id in 0..5 {
            assert_eq!(rx.receive(), Message::release(id));
        }
        // and the other direction is independent
        assert_eq!(tx.try_receive(), None);
    }
}
