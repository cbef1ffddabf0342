use crate::transport::Side;

/// Errors reported by the fallible (non-audio) parts of the crate.
///
/// None of these ever stop a render or control loop: callers log and drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A transport word carried a kind tag this crate doesn't know about
    #[error("unknown transport message kind {0}")]
    UnknownKind(u8),
    /// A MIDI transport word carried no MIDI bytes
    #[error("empty MIDI transport word")]
    EmptyMidi,
    /// A buffer id referred to a buffer outside of the pool
    #[error("buffer {0} is out of range")]
    BufferOutOfRange(u8),
    /// A side tried to take a buffer it does not currently own
    #[error("buffer {id} is not available to the {side:?} side")]
    NotOwned {
        /// The offending buffer id
        id: u8,
        /// The side that attempted to accept the buffer
        side: Side,
    },
    /// The requested sample rate has no generated lookup tables
    #[error("unsupported sample rate {0}")]
    UnsupportedSampleRate(u32),
    /// An [crate::engine::EngineConfig] failed validation
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(&'static str),
}
