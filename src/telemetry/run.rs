//! Run and worker span helpers.

use tracing::Span;

use crate::model::{InputEnd, RunId, WorkerId};

/// Start a span for one engine run.
///
/// `source` is "reader" or "queue". The `run.input_end` field is declared
/// empty and filled by [`record_input_end`] when the run finishes.
pub fn start_run_span(run_id: &RunId, workers: usize, source: &str) -> Span {
    tracing::info_span!(
        "fanreduce.run",
        "run.id" = %run_id,
        "run.workers" = workers,
        "run.source" = source,
        "run.input_end" = tracing::field::Empty,
    )
}

/// Child span of `run` for one worker thread.
pub fn worker_span(run: &Span, worker: WorkerId) -> Span {
    tracing::debug_span!(parent: run, "fanreduce.worker", "worker.id" = worker.0)
}

/// Record how the run's input ended.
pub fn record_input_end(span: &Span, end: InputEnd) {
    span.record("run.input_end", tracing::field::display(end));
}
