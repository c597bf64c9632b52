//! Worker loop: pull one item, reduce it inside a fault boundary, deliver a
//! present result.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_channel::{Receiver, Sender, select};
use opentelemetry::metrics::Counter;
use tracing::{Span, debug, warn};

use super::coordinator::{RunTally, WorkerSlot};
use super::queue::CancelToken;
use crate::model::{FaultKind, Outcome, ReduceFault, WorkerId};
use crate::reducer::Reducer;
use crate::telemetry::metrics;
use crate::telemetry::run::worker_span;

/// Everything one worker thread owns.
pub(crate) struct Worker<I, Rd: Reducer<I>> {
    pub id: WorkerId,
    pub reducer: Arc<Rd>,
    pub input: Receiver<I>,
    pub output: Sender<Outcome<Rd::Output>>,
    pub cancel: CancelToken,
    pub tally: Arc<RunTally>,
    pub _slot: WorkerSlot,
    pub run_span: Span,
}

struct Instruments {
    items: Counter<u64>,
    results: Counter<u64>,
    absent: Counter<u64>,
    faults: Counter<u64>,
}

impl Instruments {
    fn new() -> Self {
        Self {
            items: metrics::items_reduced(),
            results: metrics::results_emitted(),
            absent: metrics::absent_results(),
            faults: metrics::reducer_faults(),
        }
    }
}

impl<I, Rd> Worker<I, Rd>
where
    I: Send + 'static,
    Rd: Reducer<I>,
{
    pub fn spawn(self) -> std::io::Result<std::thread::JoinHandle<()>> {
        std::thread::Builder::new()
            .name(format!("fanreduce-worker-{}", self.id.0))
            .spawn(move || self.run())
    }

    /// Runs until the input is closed and empty, the output is disconnected,
    /// or the run is cancelled. The slot is released when `self` drops.
    fn run(self) {
        let span = worker_span(&self.run_span, self.id);
        let _enter = span.enter();
        let instruments = Instruments::new();
        debug!(worker = %self.id, "worker started");

        let mut reduced: u64 = 0;
        loop {
            if self.cancel.is_cancelled() {
                self.tally.observe_cancel();
                break;
            }

            let item = select! {
                recv(self.input) -> msg => match msg {
                    Ok(item) => item,
                    // Closed and drained.
                    Err(_) => break,
                },
                recv(self.cancel.signal()) -> _ => {
                    self.tally.observe_cancel();
                    break;
                }
            };

            reduced += 1;
            self.tally.items_reduced.fetch_add(1, Ordering::Relaxed);
            instruments.items.add(1, &[]);

            let outcome = match reduce_guarded(self.reducer.as_ref(), item, self.id) {
                Some(outcome) => outcome,
                None => {
                    self.tally.absent_results.fetch_add(1, Ordering::Relaxed);
                    instruments.absent.add(1, &[]);
                    continue;
                }
            };

            if let Outcome::Fault(ref fault) = outcome {
                warn!(worker = %self.id, kind = %fault.kind, error = %fault.message, "reducer fault");
            }

            // In-flight results are discarded once cancelled.
            if self.cancel.is_cancelled() {
                self.tally.discarded.fetch_add(1, Ordering::Relaxed);
                self.tally.observe_cancel();
                break;
            }

            let is_fault = outcome.is_fault();
            select! {
                send(self.output, outcome) -> res => {
                    if res.is_err() {
                        self.tally.discarded.fetch_add(1, Ordering::Relaxed);
                        self.tally.abandoned.store(true, Ordering::SeqCst);
                        debug!(worker = %self.id, "output disconnected, stopping");
                        break;
                    }
                    if is_fault {
                        self.tally.faults.fetch_add(1, Ordering::Relaxed);
                        instruments.faults.add(1, &[]);
                    } else {
                        self.tally.results_emitted.fetch_add(1, Ordering::Relaxed);
                        instruments.results.add(1, &[]);
                    }
                }
                recv(self.cancel.signal()) -> _ => {
                    self.tally.discarded.fetch_add(1, Ordering::Relaxed);
                    self.tally.observe_cancel();
                    break;
                }
            }
        }

        debug!(worker = %self.id, items = reduced, "worker stopped");
    }
}

/// Apply the reducer, converting a panic or an error into a fault outcome.
/// `None` means the reducer produced no result for this item.
pub(crate) fn reduce_guarded<I, Rd>(
    reducer: &Rd,
    item: I,
    worker: WorkerId,
) -> Option<Outcome<Rd::Output>>
where
    Rd: Reducer<I>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| reducer.reduce(item))) {
        Ok(Ok(Some(value))) => Some(Outcome::Value(value)),
        Ok(Ok(None)) => None,
        Ok(Err(e)) => Some(Outcome::Fault(ReduceFault {
            worker,
            kind: FaultKind::Failed,
            message: e.message,
        })),
        Err(payload) => Some(Outcome::Fault(ReduceFault {
            worker,
            kind: FaultKind::Panicked,
            message: panic_message(payload.as_ref()),
        })),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "reducer panicked with a non-string payload".to_string()
    }
}
