//! An in-process [Fifo] built on bounded channels, for running the control
//! and render loops as two host threads.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};

use super::Fifo;

/// The depth of each direction, matching the RP2040's SIO FIFOs
pub const DEPTH: usize = 8;

/// One end of a loopback FIFO pair
pub struct LoopbackFifo {
    tx: SyncSender<u32>,
    rx: Receiver<u32>,
}

/// Create two connected ends: words pushed into one pop out of the other
pub fn pair() -> (LoopbackFifo, LoopbackFifo) {
    let (tx_a, rx_b) = sync_channel(DEPTH);
    let (tx_b, rx_a) = sync_channel(DEPTH);
    (
        LoopbackFifo { tx: tx_a, rx: rx_a },
        LoopbackFifo { tx: tx_b, rx: rx_b },
    )
}

impl Fifo for LoopbackFifo {
    fn push_blocking(&mut self, word: u32) {
        // a disconnected peer has stopped listening; the word goes nowhere
        let _ = self.tx.send(word);
    }
    fn try_push(&mut self, word: u32) -> bool {
        match self.tx.try_send(word) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => true,
        }
    }
    fn pop_blocking(&mut self) -> u32 {
        match self.rx.recv() {
            Ok(word) => word,
            // nothing can ever arrive, so waiting would hang forever
            Err(_) => panic!("loopback FIFO peer disconnected while waiting for a word"),
        }
    }
    fn try_pop(&mut self) -> Option<u32> {
        match self.rx.try_recv() {
            Ok(word) => Some(word),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_fifo_refuses() {
        let (mut a, mut b) = pair();
        for i in 0..DEPTH as u32 {
            assert!(a.try_push(i + 1));
        }
        assert!(!a.try_push(99));
        assert_eq!(b.try_pop(), Some(1));
        assert!(a.try_push(99));
        assert_eq!(a.try_pop(), None);
    }
    #[test]
    fn queued_words_outlive_the_peer() {
        let (mut a, mut b) = pair();
        a.push_blocking(5);
        drop(a);
        assert_eq!(b.pop_blocking(), 5);
    }
    #[test]
    #[should_panic(expected = "peer disconnected")]
    fn disconnected_peer_panics() {
        let (a, mut b) = pair();
        drop(a);
        b.pop_blocking();
    }
}
