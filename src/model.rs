//! Core data model.
//!
//! Items and results are caller-chosen types. What flows out of the engine is
//! an [`Outcome`]: either a present result or a fault raised while reducing
//! one item. A run is summarized by a [`RunReport`] once the output closes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Ordinal identity of a worker within one run. Diagnostics only; all
/// workers are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Newtype for run IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// One entry on the output queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// The reducer returned a present result.
    Value(R),
    /// The reducer panicked or returned an error for one item.
    Fault(ReduceFault),
}

impl<R> Outcome<R> {
    pub fn value(self) -> Option<R> {
        match self {
            Outcome::Value(v) => Some(v),
            Outcome::Fault(_) => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::Fault(_))
    }
}

/// How a reducer call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The reducer panicked; the panic was caught at the fault boundary.
    Panicked,
    /// The reducer returned an error.
    Failed,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FaultKind::Panicked => "panicked",
            FaultKind::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A reducer failure, tagged with the worker that observed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceFault {
    pub worker: WorkerId,
    pub kind: FaultKind,
    pub message: String,
}

impl std::fmt::Display for ReduceFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} reducer {}: {}", self.worker, self.kind, self.message)
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Why the input side of a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEnd {
    /// The producer pushed everything and the input queue was closed.
    Exhausted,
    /// The byte stream failed mid-read; lines before the failure were processed.
    ReadFailure,
    /// The run was cancelled before the input was exhausted.
    Cancelled,
    /// The consumer dropped the output stream before the run finished.
    Abandoned,
}

impl std::fmt::Display for InputEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InputEnd::Exhausted => "exhausted",
            InputEnd::ReadFailure => "read_failure",
            InputEnd::Cancelled => "cancelled",
            InputEnd::Abandoned => "abandoned",
        };
        write!(f, "{s}")
    }
}

/// Summary of one engine run, published when the output queue closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub workers: usize,
    /// Items taken off the input queue and handed to the reducer.
    pub items_reduced: u64,
    /// Present results delivered onto the output queue.
    pub results_emitted: u64,
    /// Items whose reducer returned no result.
    pub absent_results: u64,
    /// Reducer panics and errors delivered as fault outcomes.
    pub faults: u64,
    /// Results or faults computed but never delivered (cancellation or a
    /// dropped consumer).
    pub discarded: u64,
    /// Worker threads that died outside the fault boundary.
    pub lost_workers: usize,
    pub input_end: InputEnd,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}
