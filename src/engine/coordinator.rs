//! Completion coordination: detect "all workers finished" and close the
//! output queue exactly once.
//!
//! Every worker holds a [`WorkerSlot`] from before its thread is spawned until
//! the thread exits. The slot is released in `Drop`, so it fires on every exit
//! path. The coordinator owns the last output sender and drops it only after
//! joining every worker thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use tracing::{Span, debug, error, info, warn};

use super::queue::CancelToken;
use crate::error::{Error, Result};
use crate::model::{InputEnd, Outcome, RunId, RunReport};
use crate::segment::SegmentEnd;
use crate::telemetry::metrics;
use crate::telemetry::run::record_input_end;

/// Number of workers still running.
#[derive(Clone, Default)]
pub struct CompletionCounter {
    running: Arc<AtomicUsize>,
}

impl CompletionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one more worker as running. The returned slot releases it on drop.
    pub(crate) fn acquire(&self) -> WorkerSlot {
        self.running.fetch_add(1, Ordering::SeqCst);
        WorkerSlot {
            running: Arc::clone(&self.running),
        }
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

/// A worker's "still running" marker.
pub(crate) struct WorkerSlot {
    running: Arc<AtomicUsize>,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-run counters shared by all workers.
#[derive(Default)]
pub(crate) struct RunTally {
    pub items_reduced: AtomicU64,
    pub results_emitted: AtomicU64,
    pub absent_results: AtomicU64,
    pub faults: AtomicU64,
    pub discarded: AtomicU64,
    /// Set by a worker that found the output queue disconnected.
    pub abandoned: AtomicBool,
    /// Set by a worker that stopped because the run was cancelled.
    pub cancelled: AtomicBool,
}

impl RunTally {
    pub fn observe_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// What the coordinator hands back to the output stream.
pub(crate) struct RunSummary {
    pub report: RunReport,
    pub read_failure: Option<(usize, std::io::Error)>,
}

impl RunSummary {
    pub fn into_result(self) -> Result<RunReport> {
        match self.read_failure {
            Some((line, source)) => Err(Error::ReadFailure { line, source }),
            None => Ok(self.report),
        }
    }
}

pub(crate) struct Coordinator<R> {
    pub run_id: RunId,
    pub span: Span,
    pub workers: Vec<JoinHandle<()>>,
    pub counter: CompletionCounter,
    pub tally: Arc<RunTally>,
    pub cancel: CancelToken,
    /// The coordinator's own output sender. Dropping it after the last worker
    /// has exited is what closes the output queue.
    pub output: Sender<Outcome<R>>,
    /// Segmenter outcome from the stream-backed producer, if any.
    pub producer_end: Option<Receiver<SegmentEnd>>,
    pub started_at: DateTime<Utc>,
    pub started: Instant,
}

impl<R: Send + 'static> Coordinator<R> {
    pub fn spawn(self) -> std::io::Result<JoinHandle<RunSummary>> {
        std::thread::Builder::new()
            .name("fanreduce-coordinator".to_string())
            .spawn(move || self.run())
    }

    fn run(self) -> RunSummary {
        let Coordinator {
            run_id,
            span,
            workers,
            counter,
            tally,
            cancel,
            output,
            producer_end,
            started_at,
            started,
        } = self;
        let _enter = span.enter();
        let worker_count = workers.len();

        let mut lost_workers = 0;
        for (ordinal, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                lost_workers += 1;
                error!(%run_id, worker = ordinal, "worker thread died outside the fault boundary");
            }
        }
        debug_assert_eq!(counter.running(), 0, "worker slots outstanding after join");

        drop(output);
        debug!(%run_id, "output queue closed");

        // Only a cancel observed by a worker counts; one that lands after the
        // joins leaves the run's outcome as it was.
        let observed_cancel = tally.cancelled.load(Ordering::SeqCst);
        let abandoned = tally.abandoned.load(Ordering::SeqCst);

        // With every worker gone because the input closed, the producer has
        // already reported. After a cancel, an abandoned output or a lost
        // worker it may still be blocked in a read, so only poll.
        let may_block = lost_workers == 0 && !observed_cancel && !abandoned;
        let end = producer_end.map(|rx| {
            if may_block {
                rx.recv().ok()
            } else {
                rx.try_recv().ok()
            }
        });

        let mut read_failure = None;
        let input_end = match end {
            // Surfaced even when the run was also cancelled.
            Some(Some(SegmentEnd::ReadFailure { lines, source })) => {
                read_failure = Some((lines, source));
                InputEnd::ReadFailure
            }
            _ if observed_cancel => InputEnd::Cancelled,
            _ if abandoned => InputEnd::Abandoned,
            None | Some(Some(SegmentEnd::EndOfStream { .. })) => InputEnd::Exhausted,
            Some(Some(SegmentEnd::Stopped { .. })) => {
                if cancel.is_cancelled() {
                    InputEnd::Cancelled
                } else {
                    InputEnd::Abandoned
                }
            }
            Some(None) if !may_block => {
                debug!(%run_id, "producer still running, input end unknown");
                InputEnd::Exhausted
            }
            Some(None) => {
                warn!(%run_id, "producer exited without reporting how input ended");
                InputEnd::Exhausted
            }
        };
        record_input_end(&span, input_end);

        let duration_ms = started.elapsed().as_millis() as u64;
        metrics::run_duration_ms().record(duration_ms as f64, &[]);

        let report = RunReport {
            run_id,
            workers: worker_count,
            items_reduced: tally.items_reduced.load(Ordering::SeqCst),
            results_emitted: tally.results_emitted.load(Ordering::SeqCst),
            absent_results: tally.absent_results.load(Ordering::SeqCst),
            faults: tally.faults.load(Ordering::SeqCst),
            discarded: tally.discarded.load(Ordering::SeqCst),
            lost_workers,
            input_end,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        };

        info!(
            %run_id,
            items = report.items_reduced,
            results = report.results_emitted,
            absent = report.absent_results,
            faults = report.faults,
            discarded = report.discarded,
            input_end = %input_end,
            duration_ms,
            "run finished"
        );

        RunSummary {
            report,
            read_failure,
        }
    }
}
