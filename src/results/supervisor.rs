use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::flusher::PipeFlusher;
use super::purger::MetadataPurger;
use crate::backend::Pipeline;

struct LoopHandle {
    name: &'static str,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LoopHandle {
    fn spawn<F>(name: &'static str, run: impl FnOnce(CancellationToken) -> F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(cancel.clone()));
        Self { name, cancel, task }
    }

    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(task = self.name, error = %e, "Background loop ended abnormally");
        }
    }
}

/// Owns the background loops of a result store
///
/// Shutdown order: the flusher drains the pipe and stops, then the purger
/// stops, then the pipe is closed and anything queued in between is drained. Dropping
/// the supervisor without calling [`Supervisor::shutdown`] cancels both
/// loops; the flusher still performs its final drain.
pub struct Supervisor {
    flusher: Option<LoopHandle>,
    purger: Option<LoopHandle>,
    pipeline: Option<Arc<Pipeline>>,
}

impl Supervisor {
    /// Spawn whichever loops are configured. Must run inside a tokio runtime.
    pub fn start(
        flusher: Option<PipeFlusher>,
        purger: Option<MetadataPurger>,
        pipeline: Option<Arc<Pipeline>>,
    ) -> Self {
        let flusher = flusher.map(|f| LoopHandle::spawn("pipe_flusher", |cancel| f.run(cancel)));
        let purger = purger.map(|p| LoopHandle::spawn("meta_purger", |cancel| p.run(cancel)));
        Self {
            flusher,
            purger,
            pipeline,
        }
    }

    pub fn is_running(&self) -> bool {
        self.flusher.is_some() || self.purger.is_some()
    }

    pub async fn shutdown(mut self) {
        if let Some(flusher) = self.flusher.take() {
            flusher.stop().await;
        }
        if let Some(purger) = self.purger.take() {
            purger.stop().await;
        }
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.close();
            let length = pipeline.len();
            if length > 0 {
                info!(length, "Draining commands queued during shutdown");
                if let Err(e) = pipeline.exec().await {
                    warn!(error = %e, "Could not execute result pipe during shutdown");
                }
            }
        }
        info!("Result store background loops stopped");
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        for handle in [&self.flusher, &self.purger].into_iter().flatten() {
            handle.cancel.cancel();
        }
    }
}
