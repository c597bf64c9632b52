//! Fan-out/fan-in engine.
//!
//! A fixed pool of workers competes for items on one input queue, reduces
//! each, and merges present results onto one output queue. The completion
//! coordinator closes the output once every worker has exited.
//!
//! Two ways to feed a run:
//! - [`Engine::start_from_reader`]: the engine owns the input queue, fills it
//!   from a byte stream line by line, and closes it at end of stream.
//! - [`Engine::start_from_queue`]: the caller owns the input queue (see
//!   [`input_queue`]) and must close it after the last push. The engine never
//!   closes a queue it did not create.

pub mod coordinator;
pub mod producer;
pub mod queue;
pub mod stream;
pub mod worker;

pub use coordinator::CompletionCounter;
pub use queue::{CancelToken, InputFeeder, Rejected, input_queue};
pub use stream::{RecvTimeout, ResultStream};

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use crossbeam_channel::{Receiver, bounded};
use tracing::{Span, info};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{RunId, WorkerId};
use crate::reducer::Reducer;
use crate::segment::SegmentEnd;
use crate::telemetry::run::start_run_span;
use coordinator::{Coordinator, RunTally};
use producer::spawn_producer;
use worker::Worker;

/// The engine. Holds only sizing; every start creates a fresh run.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine. Fails if the configuration cannot run (zero workers).
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reduce every line of `reader` in parallel.
    ///
    /// The engine creates the input queue, runs the segmenter on a producer
    /// thread, and closes the queue itself when the segmenter finishes.
    pub fn start_from_reader<R, Rd>(&self, reader: R, reducer: Rd) -> Result<ResultStream<Rd::Output>>
    where
        R: Read + Send + 'static,
        Rd: Reducer<String>,
    {
        let run_id = RunId::new();
        let span = start_run_span(&run_id, self.config.workers, "reader");
        let cancel = CancelToken::new();

        let (input_tx, input_rx) = bounded(self.config.input_capacity);
        let producer_end = spawn_producer(reader, input_tx, cancel.clone(), span.clone())?;

        self.launch(run_id, span, input_rx, reducer, cancel, Some(producer_end))
    }

    /// Reduce items pushed by the caller onto `input`.
    ///
    /// The run ends once the caller closes the queue and the workers drain
    /// it. If the caller never closes it, the run never ends.
    pub fn start_from_queue<I, Rd>(&self, input: Receiver<I>, reducer: Rd) -> Result<ResultStream<Rd::Output>>
    where
        I: Send + 'static,
        Rd: Reducer<I>,
    {
        let run_id = RunId::new();
        let span = start_run_span(&run_id, self.config.workers, "queue");
        self.launch(run_id, span, input, reducer, CancelToken::new(), None)
    }

    fn launch<I, Rd>(
        &self,
        run_id: RunId,
        span: Span,
        input: Receiver<I>,
        reducer: Rd,
        cancel: CancelToken,
        producer_end: Option<Receiver<SegmentEnd>>,
    ) -> Result<ResultStream<Rd::Output>>
    where
        I: Send + 'static,
        Rd: Reducer<I>,
    {
        let started = Instant::now();
        let started_at = Utc::now();
        let (output_tx, output_rx) = bounded(self.config.output_capacity);
        let reducer = Arc::new(reducer);
        let counter = CompletionCounter::new();
        let tally = Arc::new(RunTally::default());

        info!(
            %run_id,
            workers = self.config.workers,
            input_capacity = self.config.input_capacity,
            output_capacity = self.config.output_capacity,
            "run starting"
        );

        let mut workers = Vec::with_capacity(self.config.workers);
        for ordinal in 0..self.config.workers {
            let worker = Worker {
                id: WorkerId(ordinal),
                reducer: Arc::clone(&reducer),
                input: input.clone(),
                output: output_tx.clone(),
                cancel: cancel.clone(),
                tally: Arc::clone(&tally),
                _slot: counter.acquire(),
                run_span: span.clone(),
            };
            match worker.spawn() {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Already-spawned workers and the producer stop on cancel.
                    cancel.cancel();
                    return Err(e.into());
                }
            }
        }
        // Workers hold the only remaining receivers; once they exit, a
        // blocked producer push fails instead of hanging.
        drop(input);

        let coordinator = Coordinator {
            run_id,
            span,
            workers,
            counter: counter.clone(),
            tally,
            cancel: cancel.clone(),
            output: output_tx,
            producer_end,
            started_at,
            started,
        };
        let handle = match coordinator.spawn() {
            Ok(handle) => handle,
            Err(e) => {
                cancel.cancel();
                return Err(e.into());
            }
        };

        Ok(ResultStream::new(run_id, output_rx, handle, counter, cancel))
    }
}
