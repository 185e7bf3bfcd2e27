//! Prometheus metrics for layout-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const LAYOUTS_STORED: &str = "layout_layouts_stored";
const BATCHES_PROCESSED_TOTAL: &str = "layout_batches_processed_total";
const QR_GENERATED_TOTAL: &str = "layout_qr_generated_total";
const QR_FALLBACKS_TOTAL: &str = "layout_qr_fallbacks_total";
const QR_FILES_SAVED_TOTAL: &str = "layout_qr_files_saved_total";
const QR_FILES_REMOVED_TOTAL: &str = "layout_qr_files_removed_total";
const VALIDATION_FAILURES_TOTAL: &str = "layout_validation_failures_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Update the number of stored layouts.
#[allow(clippy::cast_precision_loss)]
pub fn set_layouts_stored(count: usize) {
    gauge!(LAYOUTS_STORED).set(count as f64);
}

/// Record a processed variable batch.
///
/// # Arguments
///
/// * `format` - Output format ("json" or "html")
/// * `qr_generated` - QR codes encoded for the batch
/// * `qr_fallbacks` - QR codes replaced by the fallback image
pub fn record_batch_processed(format: &'static str, qr_generated: usize, qr_fallbacks: usize) {
    counter!(BATCHES_PROCESSED_TOTAL, "format" => format).increment(1);
    counter!(QR_GENERATED_TOTAL).increment(qr_generated as u64);
    counter!(QR_FALLBACKS_TOTAL).increment(qr_fallbacks as u64);
}

/// Record a QR code image saved to the folder.
pub fn record_qr_file_saved() {
    counter!(QR_FILES_SAVED_TOTAL).increment(1);
}

/// Record QR code images removed by cleanup.
pub fn record_qr_files_removed(count: usize) {
    counter!(QR_FILES_REMOVED_TOTAL).increment(count as u64);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (filename, layout_name, variables, etc.)
pub fn record_validation_failure(validation_type: &'static str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type
    )
    .increment(1);
}
