//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//! Everything registers against a per-instance registry so multiple
//! ledgers can coexist in one process.
//!
//! # Metrics
//!
//! - `ledger_groups_total` - Total number of transaction groups persisted
//! - `ledger_rows_total` - Total number of ledger rows persisted
//! - `ledger_batch_rows` - Histogram of rows per group
//! - `ledger_insert_duration_seconds` - Histogram of insert latencies
//! - `ledger_insert_failures_total` - Total number of rejected inserts

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total transaction groups persisted
    pub groups_total: IntCounter,

    /// Total ledger rows persisted
    pub rows_total: IntCounter,

    /// Rows-per-group histogram
    pub batch_rows: Histogram,

    /// Insert duration histogram
    pub insert_duration: Histogram,

    /// Rejected inserts (configuration, resolution, persistence)
    pub insert_failures: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let groups_total = IntCounter::with_opts(Opts::new(
            "ledger_groups_total",
            "Total number of transaction groups persisted",
        ))?;
        registry.register(Box::new(groups_total.clone()))?;

        let rows_total = IntCounter::with_opts(Opts::new(
            "ledger_rows_total",
            "Total number of ledger rows persisted",
        ))?;
        registry.register(Box::new(rows_total.clone()))?;

        let batch_rows = Histogram::with_opts(
            HistogramOpts::new("ledger_batch_rows", "Histogram of rows per transaction group")
                .buckets(vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 16.0]),
        )?;
        registry.register(Box::new(batch_rows.clone()))?;

        let insert_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_insert_duration_seconds",
                "Histogram of insert latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(insert_duration.clone()))?;

        let insert_failures = IntCounter::with_opts(Opts::new(
            "ledger_insert_failures_total",
            "Total number of rejected inserts",
        ))?;
        registry.register(Box::new(insert_failures.clone()))?;

        Ok(Self {
            groups_total,
            rows_total,
            batch_rows,
            insert_duration,
            insert_failures,
            registry,
        })
    }
}
