//! Queues and the cancellation signal shared by the producer and workers.
//!
//! Both queues are bounded crossbeam channels. Capacity `0` gives rendezvous
//! semantics: a send completes only when a receiver takes the value, which is
//! how a slow consumer's pace reaches the producer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

/// Create an input queue owned by the caller.
///
/// Hand the receiver to [`Engine::start_from_queue`](super::Engine::start_from_queue)
/// and keep the feeder. The engine never closes this queue; the run ends only
/// after the feeder is closed (or dropped).
pub fn input_queue<I>(capacity: usize) -> (InputFeeder<I>, Receiver<I>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (InputFeeder { tx }, rx)
}

/// The pushing end of a caller-owned input queue.
pub struct InputFeeder<I> {
    tx: Sender<I>,
}

/// An item the queue refused because no worker is left to receive it.
pub struct Rejected<I>(pub I);

impl<I> std::fmt::Debug for Rejected<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Rejected(..)")
    }
}

impl<I> std::fmt::Display for Rejected<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("input queue has no remaining receivers")
    }
}

impl<I> InputFeeder<I> {
    /// Push one item, blocking until the queue has room (or, at capacity 0,
    /// until a worker takes it).
    pub fn push(&self, item: I) -> Result<(), Rejected<I>> {
        self.tx.send(item).map_err(|e| Rejected(e.into_inner()))
    }

    /// Close the queue. Workers drain what is buffered, then exit.
    pub fn close(self) {
        drop(self.tx);
    }
}

/// Uninhabited message type: the cancel channel never carries a value, its
/// disconnection is the signal.
pub(crate) enum Never {}

struct CancelInner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<Never>>>,
    signal: Receiver<Never>,
}

/// Cooperative cancellation for one run.
///
/// Cloning shares the same signal. Cancelling is idempotent.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Request cancellation and wake every thread blocked on [`Self::signal`].
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        // Dropping the only sender disconnects the signal channel.
        let trigger = match self.inner.trigger.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(trigger);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once cancelled. For use in
    /// `crossbeam_channel::select!`.
    pub(crate) fn signal(&self) -> &Receiver<Never> {
        &self.inner.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
