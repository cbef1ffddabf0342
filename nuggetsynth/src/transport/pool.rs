use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::Error;

const FREE: u8 = 0;
const CONTROL: u8 = 1;
const RENDER: u8 = 2;
const CLAIMED: u8 = 0x80;

/// The two ends of the transport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The core that talks to the outside world and plays buffers out
    /// (the consumer of audio)
    Control,
    /// The core that fills buffers with audio (the producer)
    Render,
}

impl Side {
    /// The opposite side
    pub const fn other(self) -> Self {
        match self {
            Self::Control => Self::Render,
            Self::Render => Self::Control,
        }
    }
    const fn tag(self) -> u8 {
        match self {
            Self::Control => CONTROL,
            Self::Render => RENDER,
        }
    }
}

/// A fixed set of `N` audio buffers of `LEN` packed frames each, shared by
/// both cores.
///
/// Every buffer carries an ownership tag naming the side it was last handed
/// to (or free, before first use).  Memory is only reachable through a
/// [BufferToken], and [BufferPool::accept] only issues one to the side named
/// by the tag, once.  Handing the token back with [BufferPool::transfer]
/// retags the buffer for the other side.
///
/// Each tag is only ever written by the side that currently owns it, so
/// plain atomic loads and stores are enough (the RP2040 has no atomic
/// read-modify-write).  Free buffers belong to the control side.
pub struct BufferPool<const N: usize, const LEN: usize> {
    buffers: [UnsafeCell<[u32; LEN]>; N],
    tags: [AtomicU8; N],
}

// SAFETY: buffer memory is only reachable through a BufferToken, and at most
// one token per buffer exists at any time (see accept)
unsafe impl<const N: usize, const LEN: usize> Sync for BufferPool<N, LEN> {}

impl<const N: usize, const LEN: usize> Default for BufferPool<N, LEN> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const LEN: usize> BufferPool<N, LEN> {
    /// Create a pool of zeroed, free buffers.  Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            buffers: [const { UnsafeCell::new([0u32; LEN]) }; N],
            tags: [const { AtomicU8::new(FREE) }; N],
        }
    }
    /// The number of buffers
    pub const fn len(&self) -> usize {
        N
    }
    /// True for a pool without buffers
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
    /// The side that may currently accept buffer `id`, or `None` if it is
    /// out of range or already accepted
    pub fn owner(&self, id: u8) -> Option<Side> {
        match self.tags.get(id as usize)?.load(Ordering::Acquire) {
            FREE | CONTROL => Some(Side::Control),
            RENDER => Some(Side::Render),
            _ => None,
        }
    }
    /// Take possession of buffer `id` on `side`.
    ///
    /// Fails if the id is out of range, the buffer was last handed to the
    /// other side, or `side` already holds a token for it.
    pub fn accept(&self, id: u8, side: Side) -> Result<BufferToken<'_, LEN>, Error> {
        let tag = self
            .tags
            .get(id as usize)
            .ok_or(Error::BufferOutOfRange(id))?;
        let current = tag.load(Ordering::Acquire);
        let ours = current == side.tag() || (current == FREE && side == Side::Control);
        if !ours {
            return Err(Error::NotOwned { id, side });
        }
        tag.store(side.tag() | CLAIMED, Ordering::Relaxed);
        Ok(BufferToken {
            buffer: &self.buffers[id as usize],
            id,
            side,
        })
    }
    /// Give up the buffer behind `token` to the other side, returning the id
    /// to send along with it
    pub fn transfer(&self, token: BufferToken<'_, LEN>) -> u8 {
        let id = token.id;
        self.tags[id as usize].store(token.side.other().tag(), Ordering::Release);
        id
    }
}

/// Exclusive access to one buffer of a [BufferPool]
pub struct BufferToken<'a, const LEN: usize> {
    buffer: &'a UnsafeCell<[u32; LEN]>,
    id: u8,
    side: Side,
}

// SAFETY: the token is the unique handle to its buffer
unsafe impl<const LEN: usize> Send for BufferToken<'_, LEN> {}

impl<const LEN: usize> BufferToken<'_, LEN> {
    /// The buffer's id
    pub fn id(&self) -> u8 {
        self.id
    }
    /// The side holding this token
    pub fn side(&self) -> Side {
        self.side
    }
    /// Read the buffer
    pub fn samples(&self) -> &[u32; LEN] {
        // SAFETY: no other token for this buffer exists
        unsafe { &*self.buffer.get() }
    }
    /// Write the buffer
    pub fn samples_mut(&mut self) -> &mut [u32; LEN] {
        // SAFETY: no other token for this buffer exists
        unsafe { &mut *self.buffer.get() }
    }
}
