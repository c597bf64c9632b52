//! Integration tests for telemetry initialization and span helpers.

use fanreduce::model::{InputEnd, RunId, WorkerId};
use fanreduce::telemetry::{self, TelemetryConfig};

#[test]
fn telemetry_initializes_without_endpoint() {
    let config = TelemetryConfig {
        endpoint: None,
        service_name: "fanreduce-test".to_string(),
        default_filter: "debug".to_string(),
    };
    // A global subscriber can only be set once per process; a second init
    // in the same test binary returns Err instead of panicking.
    if let Ok(guard) = telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn run_span_records_input_end() {
    let run_id = RunId::new();
    let span = telemetry::run::start_run_span(&run_id, 4, "reader");
    let worker = telemetry::run::worker_span(&span, WorkerId(2));
    drop(worker);
    telemetry::run::record_input_end(&span, InputEnd::Cancelled);
}

#[test]
fn metric_instruments_are_noops_without_provider() {
    telemetry::metrics::items_reduced().add(1, &[]);
    telemetry::metrics::results_emitted().add(1, &[]);
    telemetry::metrics::absent_results().add(1, &[]);
    telemetry::metrics::reducer_faults().add(1, &[]);
    telemetry::metrics::run_duration_ms().record(12.5, &[]);
}
