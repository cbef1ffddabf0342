//! The two long-running halves of the synth.
//!
//! [ControlCore] lives on the core that owns the audio output and the MIDI
//! input.  It hands empty buffers to the render side, plays back whatever
//! comes back, and forwards MIDI.  Nothing it does after [ControlCore::start]
//! blocks: words that don't fit in the FIFO are queued and retried from the
//! audio callback.
//!
//! [RenderCore] lives on the other core and does nothing but wait for the
//! next message, render into granted buffers and hand them back.

use arrayvec::ArrayVec;
use wmidi::{Channel, ControlFunction, MidiMessage, Note, U7};

use crate::engine::Engine;
use crate::midi::{MidiDecoder, RawMidi};
use crate::transport::{BufferPool, BufferToken, Direction, Fifo, Message, Side, Transport};

/// MIDI events that can wait for room in the FIFO
pub const MIDI_QUEUE: usize = 16;

/// The hooks an audio driver calls, once per hardware buffer
pub trait AudioCallbacks {
    /// The next block of packed frames to play, or `None` to play silence.
    /// Must not block.
    fn produce_block(&mut self) -> Option<&[u32]>;
    /// A block of captured input.  Most devices have no input.
    fn consume_block(&mut self, _block: &[u32]) {}
}

/// The control side: buffer recycling, MIDI input and the output callback
pub struct ControlCore<'a, F: Fifo, const N: usize, const LEN: usize> {
    transport: Transport<F>,
    pool: &'a BufferPool<N, LEN>,
    playing: Option<BufferToken<'a, LEN>>,
    pending: ArrayVec<u8, N>,
    midi_pending: ArrayVec<RawMidi, MIDI_QUEUE>,
    decoder: MidiDecoder,
}

impl<'a, F: Fifo, const N: usize, const LEN: usize> ControlCore<'a, F, N, LEN> {
    /// Constructor.  Nothing is sent until [ControlCore::start].
    pub fn new(fifo: F, pool: &'a BufferPool<N, LEN>) -> Self {
        Self {
            transport: Transport::new(fifo),
            pool,
            playing: None,
            pending: ArrayVec::new(),
            midi_pending: ArrayVec::new(),
            decoder: MidiDecoder::new(),
        }
    }
    /// Grant every buffer in the pool to the render side.  Blocks until the
    /// render core has taken them all, so call this before the audio driver
    /// starts.
    pub fn start(&mut self) {
        log::info!("control core starting with {} buffers of {} frames", N, LEN);
        for id in 0..N as u8 {
            match self.pool.accept(id, Side::Control) {
                Ok(token) => {
                    let id = self.pool.transfer(token);
                    self.transport.send(Message::grant(id));
                }
                Err(e) => log::warn!("not granting buffer {}: {}", id, e),
            }
        }
    }
    /// Forward a packed MIDI event to the render side.  If the FIFO is full
    /// the event is queued behind any others still waiting and goes out from
    /// a later [AudioCallbacks::produce_block].
    pub fn send_midi(&mut self, raw: RawMidi) {
        self.flush_midi();
        let sent = self.midi_pending.is_empty() && self.transport.try_send(Message::Midi(raw));
        if !sent && self.midi_pending.try_push(raw).is_err() {
            log::warn!("MIDI queue overflow, dropping {:#08x}", raw.as_u32());
        }
    }
    /// Forward a MIDI message.  Messages that don't fit in a transport word
    /// (system exclusive) are dropped.
    pub fn send_message(&mut self, message: &MidiMessage) {
        match RawMidi::from_message(message) {
            Some(raw) => self.send_midi(raw),
            None => log::debug!("not forwarding {:?}", message),
        }
    }
    /// Play a note
    pub fn note_on(&mut self, channel: Channel, note: Note, velocity: U7) {
        self.send_message(&MidiMessage::NoteOn(channel, note, velocity));
    }
    /// Release a note
    pub fn note_off(&mut self, channel: Channel, note: Note) {
        self.send_message(&MidiMessage::NoteOff(channel, note, U7::MIN));
    }
    /// Change a channel parameter (see [crate::midi::cc])
    pub fn control_change(&mut self, channel: Channel, function: ControlFunction, value: U7) {
        self.send_message(&MidiMessage::ControlChange(channel, function, value));
    }
    /// Feed one byte from the MIDI input, forwarding any message it
    /// completes
    pub fn midi_in(&mut self, byte: u8) {
        if let Some(raw) = self.decoder.push(byte) {
            self.send_midi(raw);
        }
    }
    fn flush_midi(&mut self) {
        while let Some(&raw) = self.midi_pending.first() {
            if !self.transport.try_send(Message::Midi(raw)) {
                break;
            }
            self.midi_pending.remove(0);
        }
    }
    fn flush_pending(&mut self) {
        while let Some(&id) = self.pending.first() {
            if !self.transport.try_send(Message::grant(id)) {
                break;
            }
            self.pending.remove(0);
        }
    }
    fn next_released(&mut self) -> Option<BufferToken<'a, LEN>> {
        loop {
            match self.transport.try_receive()? {
                Message::Buffer {
                    direction: Direction::Release,
                    id,
                } => match self.pool.accept(id, Side::Control) {
                    Ok(token) => return Some(token),
                    Err(e) => log::warn!("dropping release: {}", e),
                },
                other => log::warn!("unexpected message from render core: {:?}", other),
            }
        }
    }
}

impl<F: Fifo, const N: usize, const LEN: usize> AudioCallbacks for ControlCore<'_, F, N, LEN> {
    fn produce_block(&mut self) -> Option<&[u32]> {
        // the driver is done with the last block, so it can be refilled
        if let Some(token) = self.playing.take() {
            let id = self.pool.transfer(token);
            if self.pending.try_push(id).is_err() {
                log::warn!("grant queue overflow, buffer {} lost", id);
            }
        }
        self.flush_pending();
        self.flush_midi();
        self.playing = self.next_released();
        self.playing.as_ref().map(|token| &token.samples()[..])
    }
}

/// The render side: owns the [Engine] and answers every grant with a release
pub struct RenderCore<'a, F: Fifo, const N: usize, const LEN: usize> {
    transport: Transport<F>,
    pool: &'a BufferPool<N, LEN>,
    engine: Engine,
}

impl<'a, F: Fifo, const N: usize, const LEN: usize> RenderCore<'a, F, N, LEN> {
    /// Constructor
    pub fn new(fifo: F, pool: &'a BufferPool<N, LEN>, engine: Engine) -> Self {
        Self {
            transport: Transport::new(fifo),
            pool,
            engine,
        }
    }
    /// The engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
    /// The engine, for direct modification
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
    /// Wait for one message and handle it
    pub fn step(&mut self) {
        let message = self.transport.receive();
        self.handle(message);
    }
    /// Handle one message if one is waiting.  Returns false if there was
    /// nothing to do.
    pub fn try_step(&mut self) -> bool {
        match self.transport.try_receive() {
            Some(message) => {
                self.handle(message);
                true
            }
            None => false,
        }
    }
    /// Handle messages forever
    pub fn run(&mut self) -> ! {
        log::info!(
            "render core starting at {} Hz",
            self.engine.context().sample_rate()
        );
        loop {
            self.step();
        }
    }
    fn handle(&mut self, message: Message) {
        match message {
            Message::Midi(raw) => self.engine.handle_midi(raw),
            Message::Buffer {
                direction: Direction::Grant,
                id,
            } => match self.pool.accept(id, Side::Render) {
                Ok(mut token) => {
                    self.engine.render(token.samples_mut());
                    let id = self.pool.transfer(token);
                    self.transport.send(Message::release(id));
                }
                Err(e) => log::warn!("dropping grant: {}", e),
            },
            Message::Buffer {
                direction: Direction::Release,
                id,
            } => log::warn!("render core was handed back buffer {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::engine::EngineConfig;
    use crate::transport::loopback::{self, LoopbackFifo};
    use core::sync::atomic::{AtomicBool, Ordering};

    type Pool = BufferPool<3, 64>;
    type Control<'a> = ControlCore<'a, LoopbackFifo, 3, 64>;
    type Render<'a> = RenderCore<'a, LoopbackFifo, 3, 64>;

    fn cores(pool: &Pool) -> (Control<'_>, Render<'_>) {
        let (a, b) = loopback::pair();
        let engine = Engine::new(Context::new_441(), EngineConfig::default()).unwrap();
        (ControlCore::new(a, pool), RenderCore::new(b, pool, engine))
    }

    #[test]
    fn buffers_cycle() {
        let pool = Pool::new();
        let (mut control, mut render) = cores(&pool);
        control.start();
        assert!((0..3).all(|id| pool.owner(id) == Some(Side::Render)));
        for _ in 0..3 {
            render.step();
        }
        assert!(control.produce_block().is_some());
        assert_eq!(control.playing.as_ref().map(|t| t.id()), Some(0));
        assert!(control.produce_block().is_some());
        // buffer 0 went back as soon as buffer 1 was taken
        assert_eq!(pool.owner(0), Some(Side::Render));
        assert_eq!(pool.owner(1), None);
        assert!(control.produce_block().is_some());
        // the render core hasn't kept up, so play silence
        assert!(control.produce_block().is_none());
        assert!(control.playing.is_none());
        render.step();
        assert_eq!(control.produce_block().map(|b| b.len()), Some(64));
    }
    #[test]
    fn full_fifo_defers_grant() {
        let pool = Pool::new();
        let (mut control, mut render) = cores(&pool);
        control.start();
        for _ in 0..3 {
            render.step();
        }
        for _ in 0..loopback::DEPTH {
            control.note_on(Channel::Ch2, Note::C4, U7::MAX);
        }
        assert!(control.produce_block().is_some());
        assert!(control.produce_block().is_some());
        assert_eq!(control.pending.as_slice(), &[0]);
        for _ in 0..loopback::DEPTH {
            assert!(render.try_step());
        }
        assert!(!render.try_step());
        assert!(render.engine().voice(4).unwrap().triggered());
        assert!(control.produce_block().is_some());
        assert!(control.pending.is_empty());
        render.step();
        assert_eq!(pool.owner(0), Some(Side::Control));
    }
    #[test]
    fn full_fifo_queues_midi() {
        let pool = Pool::new();
        let (mut control, mut render) = cores(&pool);
        control.start();
        for _ in 0..3 {
            render.step();
        }
        for _ in 0..loopback::DEPTH {
            control.note_on(Channel::Ch2, Note::C4, U7::MAX);
        }
        // neither call waits for the render core
        for byte in [0x90, 64, 100, 0x80, 64, 0] {
            control.midi_in(byte);
        }
        control.note_on(Channel::Ch1, Note::A4, U7::MAX);
        assert_eq!(control.midi_pending.len(), 3);
        for _ in 0..loopback::DEPTH {
            assert!(render.try_step());
        }
        assert!(!render.try_step());
        assert!(control.produce_block().is_some());
        assert!(control.midi_pending.is_empty());
        assert!(render.try_step());
        assert_eq!(render.engine().voice(0).unwrap().key(), 64);
        assert!(render.try_step());
        assert!(render.try_step());
        // queued in order: 64 on, 64 off, then A4 on the next voice
        assert_eq!(render.engine().voice(1).unwrap().key(), Note::A4 as u8);
        assert!(!render.try_step());
    }
    #[test]
    fn midi_queue_overflow_drops_newest() {
        let pool = Pool::new();
        let (mut control, mut render) = cores(&pool);
        control.start();
        for _ in 0..3 {
            render.step();
        }
        for _ in 0..loopback::DEPTH + MIDI_QUEUE + 4 {
            control.note_on(Channel::Ch2, Note::C4, U7::MAX);
        }
        assert_eq!(control.midi_pending.len(), MIDI_QUEUE);
    }
    #[test]
    fn two_threads_make_sound() {
        let pool = Pool::new();
        let (mut control, mut render) = cores(&pool);
        let done = AtomicBool::new(false);
        std::thread::scope(|s| {
            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    if !render.try_step() {
                        std::thread::yield_now();
                    }
                }
            });
            control.start();
            for byte in [0x90, 69, 127] {
                control.midi_in(byte);
            }
            control.control_change(Channel::Ch1, crate::midi::cc::ENV_TO_VCA, U7::MIN);
            let mut blocks = 0;
            let mut loud = false;
            while blocks < 20 {
                if let Some(block) = control.produce_block() {
                    blocks += 1;
                    loud |= block.iter().any(|frame| *frame != 0);
                } else {
                    std::thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);
            assert!(loud);
        });
    }
}
