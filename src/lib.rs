//! # fanreduce
//!
//! Fan-out/fan-in reduction over a stream of items.
//!
//! A fixed pool of workers competes for items on a bounded input queue,
//! applies a caller-supplied [`Reducer`](reducer::Reducer) to each, and merges
//! present results onto a single output stream. Queue capacities are explicit
//! (0 = rendezvous), reducer panics are isolated into fault outcomes, and the
//! output closes exactly once, after every worker has exited.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod model;
pub mod reducer;
pub mod segment;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{Engine, ResultStream, input_queue};
pub use error::{Error, Result};
pub use model::{Outcome, RunReport};
