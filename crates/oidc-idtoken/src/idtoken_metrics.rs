//! ID token validation metrics
//!
//! Enable with the `metrics` feature flag. Requires a `metrics` recorder
//! to be installed (e.g., via `metrics-exporter-prometheus`).
//!
//! ## Metrics Provided
//!
//! - `idtoken_validations_total` - Counter for validation outcomes (labels: algorithm, status)
//! - `idtoken_key_set_fetches_total` - Counter for key-set fetches (labels: status)
//! - `idtoken_validation_duration_seconds` - Histogram for validation duration

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static INIT: Once = Once::new();

/// Register metric descriptions. Idempotent; call once at startup.
#[cfg(feature = "metrics")]
pub fn init_idtoken_metrics() {
    INIT.call_once(|| {
        describe_counter!(
            "idtoken_validations_total",
            "ID token validation outcomes by algorithm and status"
        );
        describe_counter!(
            "idtoken_key_set_fetches_total",
            "Discovery + key-set fetches by status"
        );
        describe_histogram!(
            "idtoken_validation_duration_seconds",
            "ID token validation duration in seconds"
        );
    });
}

/// Record a validation outcome; `status` is `"success"` or an error kind
#[cfg(feature = "metrics")]
pub(crate) fn record_validation(algorithm: &'static str, status: &'static str) {
    counter!(
        "idtoken_validations_total",
        "algorithm" => algorithm,
        "status" => status
    )
    .increment(1);
}

#[cfg(feature = "metrics")]
pub(crate) fn record_validation_duration(duration_seconds: f64) {
    histogram!("idtoken_validation_duration_seconds").record(duration_seconds);
}

#[cfg(feature = "metrics")]
pub(crate) fn record_key_set_fetch(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("idtoken_key_set_fetches_total", "status" => status).increment(1);
}

// No-op versions when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
#[allow(missing_docs)]
pub fn init_idtoken_metrics() {}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_validation(_algorithm: &'static str, _status: &'static str) {}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_validation_duration(_duration_seconds: f64) {}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_key_set_fetch(_success: bool) {}
