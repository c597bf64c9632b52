//! The consumer's end of a run.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::warn;

use super::coordinator::{CompletionCounter, RunSummary};
use super::queue::CancelToken;
use crate::error::{Error, Result};
use crate::model::{Outcome, RunId, RunReport};

/// Result of waiting a bounded time for the next outcome.
#[derive(Debug)]
pub enum RecvTimeout<R> {
    Received(Outcome<R>),
    /// The output queue is closed and drained: the run is over.
    Closed,
    /// Nothing arrived in time; the run is still going.
    TimedOut,
}

/// Output stream of one engine run.
///
/// Iterating yields outcomes in arrival order (unrelated to input order) and
/// ends when the coordinator closes the output queue. Dropping the stream
/// mid-run disconnects the queue; workers stop at their next delivery.
pub struct ResultStream<R> {
    run_id: RunId,
    output: Receiver<Outcome<R>>,
    coordinator: JoinHandle<RunSummary>,
    counter: CompletionCounter,
    cancel: CancelToken,
}

impl<R> ResultStream<R> {
    pub(crate) fn new(
        run_id: RunId,
        output: Receiver<Outcome<R>>,
        coordinator: JoinHandle<RunSummary>,
        counter: CompletionCounter,
        cancel: CancelToken,
    ) -> Self {
        Self {
            run_id,
            output,
            coordinator,
            counter,
            cancel,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Block for the next outcome. `None` once the run is over.
    pub fn recv(&self) -> Option<Outcome<R>> {
        self.output.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> RecvTimeout<R> {
        match self.output.recv_timeout(timeout) {
            Ok(outcome) => RecvTimeout::Received(outcome),
            Err(RecvTimeoutError::Timeout) => RecvTimeout::TimedOut,
            Err(RecvTimeoutError::Disconnected) => RecvTimeout::Closed,
        }
    }

    /// Iterate over present results only. Faults are logged and skipped.
    pub fn values(&mut self) -> impl Iterator<Item = R> + '_ {
        let run_id = self.run_id;
        self.by_ref().filter_map(move |outcome| match outcome {
            Outcome::Value(v) => Some(v),
            Outcome::Fault(fault) => {
                warn!(%run_id, %fault, "skipping fault");
                None
            }
        })
    }

    /// Workers that have not exited yet.
    pub fn running_workers(&self) -> usize {
        self.counter.running()
    }

    /// A handle that cancels this run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop pulling new items, discard in-flight results, and close both
    /// engine-owned queues. Follow with [`Self::finish`] to wait for shutdown.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Discard unread outcomes, wait for every worker to exit, and return the
    /// run report. A segmenter read failure is returned as
    /// [`Error::ReadFailure`].
    ///
    /// On a caller-owned input queue that is never closed this blocks forever.
    pub fn finish(self) -> Result<RunReport> {
        for _ in self.output.iter() {}
        let summary = self
            .coordinator
            .join()
            .map_err(|_| Error::Other("coordinator thread panicked".to_string()))?;
        summary.into_result()
    }
}

impl<R> Iterator for ResultStream<R> {
    type Item = Outcome<R>;

    fn next(&mut self) -> Option<Outcome<R>> {
        self.recv()
    }
}
