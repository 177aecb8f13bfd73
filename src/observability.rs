//! Result store counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for the result store and its background loops
#[derive(Debug, Default)]
pub struct ResultMetrics {
    results_written: AtomicU64,
    outcomes_recorded: AtomicU64,
    jobs_deleted: AtomicU64,
    batches_flushed: AtomicU64,
    commands_flushed: AtomicU64,
    flush_failures: AtomicU64,
    purge_cycles: AtomicU64,
    purge_failures: AtomicU64,
}

impl ResultMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result_written(&self) {
        self.results_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn outcome_recorded(&self) {
        self.outcomes_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_deleted(&self) {
        self.jobs_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_flushed(&self, commands: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.commands_flushed
            .fetch_add(commands as u64, Ordering::Relaxed);
        tracing::debug!(counter = "batches_flushed", commands, "Metric incremented");
    }

    pub fn flush_failed(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "flush_failures", "Metric incremented");
    }

    pub fn purge_completed(&self) {
        self.purge_cycles.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "purge_cycles", "Metric incremented");
    }

    pub fn purge_failed(&self) {
        self.purge_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "purge_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            results_written: self.results_written.load(Ordering::Relaxed),
            outcomes_recorded: self.outcomes_recorded.load(Ordering::Relaxed),
            jobs_deleted: self.jobs_deleted.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            commands_flushed: self.commands_flushed.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            purge_cycles: self.purge_cycles.load(Ordering::Relaxed),
            purge_failures: self.purge_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub results_written: u64,
    pub outcomes_recorded: u64,
    pub jobs_deleted: u64,
    pub batches_flushed: u64,
    pub commands_flushed: u64,
    pub flush_failures: u64,
    pub purge_cycles: u64,
    pub purge_failures: u64,
}
