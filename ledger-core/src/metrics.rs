//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_accounts_registered_total` - Accounts newly registered
//! - `ledger_blocks_appended_total` - Blocks appended by submissions
//! - `ledger_submissions_rejected_total{reason}` - Failed submissions by error kind
//! - `ledger_chain_height` - Blocks in the chain, genesis included
//! - `ledger_verify_duration_seconds` - Histogram of full-chain verification latency

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accounts newly registered
    pub accounts_registered: IntCounter,

    /// Blocks appended
    pub blocks_appended: IntCounter,

    /// Rejected submissions, labelled by reason
    pub submissions_rejected: IntCounterVec,

    /// Current chain height
    pub chain_height: IntGauge,

    /// Chain verification duration histogram
    pub verify_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("accounts_registered", &self.accounts_registered.get())
            .field("blocks_appended", &self.blocks_appended.get())
            .field("chain_height", &self.chain_height.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let accounts_registered = IntCounter::new(
            "ledger_accounts_registered_total",
            "Total number of accounts registered",
        )?;
        registry.register(Box::new(accounts_registered.clone()))?;

        let blocks_appended = IntCounter::new(
            "ledger_blocks_appended_total",
            "Total number of blocks appended",
        )?;
        registry.register(Box::new(blocks_appended.clone()))?;

        let submissions_rejected = IntCounterVec::new(
            Opts::new(
                "ledger_submissions_rejected_total",
                "Total number of rejected transaction submissions",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(submissions_rejected.clone()))?;

        let chain_height = IntGauge::new("ledger_chain_height", "Number of blocks in the chain")?;
        registry.register(Box::new(chain_height.clone()))?;

        let verify_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_verify_duration_seconds",
                "Histogram of chain verification latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0]),
        )?;
        registry.register(Box::new(verify_duration.clone()))?;

        Ok(Self {
            accounts_registered,
            blocks_appended,
            submissions_rejected,
            chain_height,
            verify_duration,
            registry,
        })
    }

    /// Record account registration
    pub fn record_account_registered(&self) {
        self.accounts_registered.inc();
    }

    /// Record block append and the resulting height
    pub fn record_block_appended(&self, height: usize) {
        self.blocks_appended.inc();
        self.set_chain_height(height);
    }

    /// Record rejected submission
    pub fn record_rejection(&self, reason: &str) {
        self.submissions_rejected.with_label_values(&[reason]).inc();
    }

    /// Update chain height
    pub fn set_chain_height(&self, height: usize) {
        self.chain_height.set(height as i64);
    }

    /// Record verification duration
    pub fn record_verify_duration(&self, duration_seconds: f64) {
        self.verify_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
