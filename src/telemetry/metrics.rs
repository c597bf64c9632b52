//! Metric instrument factories for fanreduce.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without a provider (no OTLP endpoint) the instruments are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("fanreduce")
}

/// Counter: items taken off the input queue and reduced.
pub fn items_reduced() -> Counter<u64> {
    meter()
        .u64_counter("fanreduce.items.reduced")
        .with_description("Items handed to the reducer")
        .build()
}

/// Counter: present results delivered onto the output queue.
pub fn results_emitted() -> Counter<u64> {
    meter()
        .u64_counter("fanreduce.results.emitted")
        .with_description("Results delivered to the consumer")
        .build()
}

/// Counter: items for which the reducer returned no result.
pub fn absent_results() -> Counter<u64> {
    meter()
        .u64_counter("fanreduce.results.absent")
        .with_description("Items that produced no result")
        .build()
}

/// Counter: reducer panics and errors delivered as faults.
pub fn reducer_faults() -> Counter<u64> {
    meter()
        .u64_counter("fanreduce.reducer.faults")
        .with_description("Reducer panics and errors")
        .build()
}

/// Histogram: wall-clock duration of a whole run in milliseconds.
pub fn run_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("fanreduce.run.duration_ms")
        .with_description("Engine run duration in milliseconds")
        .with_unit("ms")
        .build()
}
