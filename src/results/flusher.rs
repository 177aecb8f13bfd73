use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::backend::Pipeline;
use crate::observability::ResultMetrics;

/// Periodically sends whatever the pipeline has queued
///
/// Idle ticks (empty queue) do nothing. A failed batch is logged and
/// dropped; the loop keeps ticking. On cancellation the queue is drained one
/// last time before the loop returns.
pub struct PipeFlusher {
    pipeline: Arc<Pipeline>,
    period: Duration,
    metrics: Arc<ResultMetrics>,
}

impl PipeFlusher {
    pub fn new(pipeline: Arc<Pipeline>, period: Duration, metrics: Arc<ResultMetrics>) -> Self {
        Self {
            pipeline,
            period,
            metrics,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(period = ?self.period, "Starting result pipe flusher");

        // First tick one full period after start
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(length = self.pipeline.len(), "Shutdown requested, draining result pipe");
                    self.flush().await;
                    info!("Result pipe flusher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let length = self.pipeline.len();
                    if length == 0 {
                        continue;
                    }
                    debug!(length, "Submitting result pipe");
                    self.flush().await;
                }
            }
        }
    }

    /// Execute the queued batch, logging rather than returning failures
    async fn flush(&self) {
        match self.pipeline.exec().await {
            Ok(0) => {}
            Ok(count) => self.metrics.batch_flushed(count),
            Err(e) => {
                self.metrics.flush_failed();
                error!(error = %e, "Could not execute result pipe");
            }
        }
    }
}
