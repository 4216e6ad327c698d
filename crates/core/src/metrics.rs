//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Case lifecycle (transitions, cancellation fees)
//! - Batch export (archive entries, export duration, milling handoff)
//! - Shipping batches
//! - Object storage requests

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Lifecycle Metrics
// =============================================================================

/// Transition requests by target status and result.
pub static TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("labflow_transitions_total", "Total case transition requests"),
        &["to_status", "result"], // result: "accepted", "rejected"
    )
    .unwrap()
});

/// Cancellation fees charged, in currency units.
pub static CANCELLATION_FEE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "labflow_cancellation_fee",
            "Distribution of cancellation fees charged",
        )
        .buckets(vec![0.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
    )
    .unwrap()
});

/// Files attached to cases by label.
pub static FILES_ATTACHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("labflow_files_attached_total", "Total files attached to cases"),
        &["label"],
    )
    .unwrap()
});

// =============================================================================
// Batch Export Metrics
// =============================================================================

/// Batch exports by result.
pub static BATCH_EXPORTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("labflow_batch_exports_total", "Total batch export requests"),
        &["result"], // "success", "no_files", "failed", "unauthorized"
    )
    .unwrap()
});

/// Archive entries by result.
pub static ARCHIVE_ENTRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "labflow_archive_entries_total",
            "Files considered for production archives",
        ),
        &["result"], // "included", "skipped"
    )
    .unwrap()
});

/// Export duration in seconds.
pub static EXPORT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "labflow_export_duration_seconds",
            "Duration of batch exports including storage fetches",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

/// Cases handed off from APPROVED to IN_MILLING by a batch export.
pub static CASES_RELEASED_TO_MILLING: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "labflow_cases_released_to_milling_total",
        "Total cases moved to milling after a batch export",
    )
    .unwrap()
});

// =============================================================================
// Shipping Metrics
// =============================================================================

/// Shipping batch requests by result.
pub static SHIPPING_BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("labflow_shipping_batches_total", "Total shipping batch requests"),
        &["result"], // "recorded", "rejected"
    )
    .unwrap()
});

/// Cases marked shipped.
pub static CASES_SHIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("labflow_cases_shipped_total", "Total cases marked shipped").unwrap()
});

// =============================================================================
// Storage Metrics
// =============================================================================

/// Object storage requests by backend, operation and status.
pub static STORAGE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "labflow_storage_requests_total",
            "Total object storage requests",
        ),
        &["backend", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Lifecycle
        Box::new(TRANSITIONS_TOTAL.clone()),
        Box::new(CANCELLATION_FEE.clone()),
        Box::new(FILES_ATTACHED.clone()),
        // Export
        Box::new(BATCH_EXPORTS_TOTAL.clone()),
        Box::new(ARCHIVE_ENTRIES.clone()),
        Box::new(EXPORT_DURATION.clone()),
        Box::new(CASES_RELEASED_TO_MILLING.clone()),
        // Shipping
        Box::new(SHIPPING_BATCHES_TOTAL.clone()),
        Box::new(CASES_SHIPPED.clone()),
        // Storage
        Box::new(STORAGE_REQUESTS.clone()),
    ]
}
