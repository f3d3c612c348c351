//! Prometheus metrics for the document gateway.
//!
//! All metrics follow the naming convention: `gw_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // DOCUMENT PIPELINE
    // =========================================================================

    /// Document versions saved, by document kind
    pub static ref DOCUMENTS_SAVED: CounterVec = CounterVec::new(
        Opts::new("gw_documents_saved_total", "Document versions saved"),
        &["kind"]
    ).expect("metric creation failed");

    /// Documents read back, by document kind
    pub static ref DOCUMENTS_READ: CounterVec = CounterVec::new(
        Opts::new("gw_documents_read_total", "Documents decrypted and returned"),
        &["kind"]
    ).expect("metric creation failed");

    /// Document versions tombstoned
    pub static ref DOCUMENTS_DELETED: Counter = Counter::new(
        "gw_documents_deleted_total",
        "Document versions flipped to DELETED"
    ).expect("metric creation failed");

    /// Failed gateway operations, by error kind
    pub static ref PIPELINE_ERRORS: CounterVec = CounterVec::new(
        Opts::new("gw_pipeline_errors_total", "Failed gateway operations"),
        &["kind"]
    ).expect("metric creation failed");

    /// Gateway operation latency
    pub static ref OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("gw_operation_duration_seconds", "Time spent in a gateway operation")
            .buckets(exponential_buckets(0.001, 2.0, 15).expect("bucket layout")),
        &["operation"]
    ).expect("metric creation failed");

    // =========================================================================
    // EXTERNAL LEGS
    // =========================================================================

    /// Ciphertext bytes handed to the content store
    pub static ref CONTENT_BYTES_STORED: Counter = Counter::new(
        "gw_content_bytes_stored_total",
        "Ciphertext bytes added to the content store"
    ).expect("metric creation failed");

    /// Ledger transactions accepted
    pub static ref BATCHES_COMMITTED: Counter = Counter::new(
        "gw_ledger_batches_committed_total",
        "Ledger transactions accepted by the node"
    ).expect("metric creation failed");

    /// Ledger transactions rejected or lost
    pub static ref COMMIT_FAILURES: Counter = Counter::new(
        "gw_ledger_commit_failures_total",
        "Ledger submissions that failed"
    ).expect("metric creation failed");
}

/// Handle proving the metrics were registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle;

/// Register every gateway metric with [`REGISTRY`]. Safe to call repeatedly.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(DOCUMENTS_SAVED.clone()),
        Box::new(DOCUMENTS_READ.clone()),
        Box::new(DOCUMENTS_DELETED.clone()),
        Box::new(PIPELINE_ERRORS.clone()),
        Box::new(OPERATION_DURATION.clone()),
        Box::new(CONTENT_BYTES_STORED.clone()),
        Box::new(BATCHES_COMMITTED.clone()),
        Box::new(COMMIT_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(MetricsHandle)
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
