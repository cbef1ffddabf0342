use rp_pico::hal::sio::SioFifo;

use nuggetsynth::transport::Fifo;

/// One core's view of the RP2040 inter-core FIFOs
pub struct CoreFifo(SioFifo);

impl CoreFifo {
    pub fn new(fifo: SioFifo) -> Self {
        Self(fifo)
    }
}

impl Fifo for CoreFifo {
    fn push_blocking(&mut self, word: u32) {
        self.0.write_blocking(word);
    }
    fn try_push(&mut self, word: u32) -> bool {
        if !self.0.is_write_ready() {
            return false;
        }
        self.0.write(word);
        true
    }
    fn pop_blocking(&mut self) -> u32 {
        self.0.read_blocking()
    }
    fn try_pop(&mut self) -> Option<u32> {
        self.0.read()
    }
}
