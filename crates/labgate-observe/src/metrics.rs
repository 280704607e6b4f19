//! Metrics collection for labgate operations
//!
//! Uses the `metrics` facade; installing an exporter is left to the host
//! application.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Initialize all metric descriptions
pub fn init_metrics_descriptions() {
    // Evaluation metrics
    describe_counter!("labgate_checks_total", "Total number of permission checks performed");
    describe_counter!("labgate_checks_allowed_total", "Total number of checks that allowed");
    describe_counter!("labgate_checks_denied_total", "Total number of checks that denied");
    describe_counter!(
        "labgate_resolution_failures_total",
        "Checks denied because the inputs could not be resolved"
    );
    describe_histogram!(
        "labgate_check_duration_seconds",
        "Duration of permission checks in seconds"
    );
    describe_counter!(
        "labgate_batch_checks_total",
        "Total number of batch (any/all) permission checks"
    );
    describe_histogram!("labgate_batch_check_size", "Number of permissions per batch check");

    // Cache metrics
    describe_counter!("labgate_cache_hits_total", "Total number of decision cache hits");
    describe_counter!("labgate_cache_misses_total", "Total number of decision cache misses");
    describe_counter!(
        "labgate_cache_invalidations_total",
        "Total number of decision cache invalidations"
    );
}

/// Record a completed permission check
pub fn record_check(allowed: bool, resolution_failure: bool, duration_seconds: f64) {
    counter!("labgate_checks_total").increment(1);

    if allowed {
        counter!("labgate_checks_allowed_total").increment(1);
    } else {
        counter!("labgate_checks_denied_total").increment(1);
    }

    if resolution_failure {
        counter!("labgate_resolution_failures_total").increment(1);
    }

    histogram!("labgate_check_duration_seconds").record(duration_seconds);
}

/// Record a batch check
pub fn record_batch_check(mode: &'static str, size: usize) {
    counter!("labgate_batch_checks_total", "mode" => mode).increment(1);
    histogram!("labgate_batch_check_size", "mode" => mode).record(size as f64);
}

/// Record a cache hit
pub fn record_cache_hit() {
    counter!("labgate_cache_hits_total").increment(1);
}

/// Record a cache miss
pub fn record_cache_miss() {
    counter!("labgate_cache_misses_total").increment(1);
}

/// Record a cache invalidation (`scope` is "principal" or "all")
pub fn record_cache_invalidation(scope: &'static str) {
    counter!("labgate_cache_invalidations_total", "scope" => scope).increment(1);
}
