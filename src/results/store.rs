use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::{Result, ResultError};
use super::flusher::PipeFlusher;
use super::keys::{result_key, Outcome};
use super::purger::{MetadataPurger, PurgeStats};
use super::supervisor::Supervisor;
use super::writer::{self, WritePath};
use crate::backend::{self, Command, RemoteStore, StoreError};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ResultsConfig};
use crate::observability::{MetricsSnapshot, ResultMetrics};

/// Runtime options for a [`ResultStore`]
///
/// Every duration defaults to zero, meaning: results never expire, no purger,
/// no batching.
#[derive(Debug, Clone, Default, Builder)]
pub struct ResultOptions {
    /// Time-to-live of each job result record
    #[builder(default)]
    pub expiry: Duration,
    /// Retention window of outcome index entries
    #[builder(default)]
    pub meta_expiry: Duration,
    /// Batch flush interval
    #[builder(default)]
    pub pipe_period: Duration,
}

impl From<&ResultsConfig> for ResultOptions {
    fn from(config: &ResultsConfig) -> Self {
        Self {
            expiry: config.expiry.as_duration(),
            meta_expiry: config.meta_expiry.as_duration(),
            pipe_period: config.pipe_period.as_duration(),
        }
    }
}

/// Job result payloads plus success/failed outcome indexes
///
/// Writes (`set`, `set_success`, `set_failed`) follow the write path chosen
/// at construction: immediate, or queued for the pipe flusher when
/// `pipe_period` is non-zero. Reads always hit the store, so batched writes
/// become visible after the next flush. `delete_job` is never batched.
///
/// Background loops are spawned by the constructor, which therefore must
/// run inside a tokio runtime. Call [`ResultStore::shutdown`] to drain and
/// stop them.
pub struct ResultStore {
    store: Arc<dyn RemoteStore>,
    writes: Arc<dyn WritePath>,
    clock: Arc<dyn Clock>,
    options: ResultOptions,
    metrics: Arc<ResultMetrics>,
    supervisor: Mutex<Option<Supervisor>>,
}

impl ResultStore {
    pub fn new(store: Arc<dyn RemoteStore>, options: ResultOptions) -> Self {
        Self::with_clock(store, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn RemoteStore>,
        options: ResultOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let metrics = Arc::new(ResultMetrics::new());
        let writes = writer::select(store.clone(), options.pipe_period);

        let flusher = writes
            .pipeline()
            .map(|pipeline| PipeFlusher::new(pipeline.clone(), options.pipe_period, metrics.clone()));
        let purger = (!options.meta_expiry.is_zero()).then(|| {
            MetadataPurger::new(
                store.clone(),
                writes.clone(),
                clock.clone(),
                options.meta_expiry,
                metrics.clone(),
            )
        });
        let supervisor = Supervisor::start(flusher, purger, writes.pipeline().cloned());

        info!(
            writes = writes.mode(),
            expiry = ?options.expiry,
            meta_expiry = ?options.meta_expiry,
            pipe_period = ?options.pipe_period,
            "Result store ready"
        );

        Self {
            store,
            writes,
            clock,
            options,
            metrics,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    /// Open the configured backend and build a store on it
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = backend::open(&config.store).await?;
        Ok(Self::new(store, ResultOptions::from(&config.results)))
    }

    /// Store the result payload for a job
    pub async fn set(&self, id: &str, payload: impl Into<Bytes>) -> Result<()> {
        debug!(id, "Setting result for job");
        let ttl = (!self.options.expiry.is_zero()).then_some(self.options.expiry);
        self.writes
            .submit(Command::Set {
                key: result_key(id),
                value: payload.into(),
                ttl,
            })
            .await?;
        self.metrics.result_written();
        Ok(())
    }

    /// Fetch the result payload for a job
    ///
    /// Returns [`ResultError::NotFound`] when no result exists or it expired.
    pub async fn get(&self, id: &str) -> Result<Bytes> {
        debug!(id, "Getting result for job");
        self.store
            .get(&result_key(id))
            .await?
            .ok_or_else(|| ResultError::NotFound(id.to_string()))
    }

    pub async fn set_success(&self, id: &str) -> Result<()> {
        self.record(Outcome::Success, id).await
    }

    pub async fn set_failed(&self, id: &str) -> Result<()> {
        self.record(Outcome::Failed, id).await
    }

    /// Add `id` to an outcome index, scored with the current time.
    /// Recording the same id again only moves its score.
    pub async fn record(&self, outcome: Outcome, id: &str) -> Result<()> {
        debug!(id, outcome = %outcome, "Recording job outcome");
        self.writes
            .submit(Command::ZAdd {
                key: outcome.index_key(),
                member: id.to_string(),
                score: self.clock.now_nanos(),
            })
            .await?;
        self.metrics.outcome_recorded();
        Ok(())
    }

    pub async fn get_success(&self) -> Result<Vec<String>> {
        self.list(Outcome::Success).await
    }

    pub async fn get_failed(&self) -> Result<Vec<String>> {
        self.list(Outcome::Failed).await
    }

    /// Job ids recorded with `outcome`, most recent first
    ///
    /// Entries scored in the future (clock skew between writers) are left out.
    pub async fn list(&self, outcome: Outcome) -> Result<Vec<String>> {
        debug!(outcome = %outcome, "Listing jobs");
        let ids = self
            .store
            .zrevrange_by_score(&outcome.index_key(), 0, self.clock.now_nanos())
            .await?;
        Ok(ids)
    }

    /// Remove a job from both indexes and delete its result, atomically.
    /// Missing entries are not an error.
    pub async fn delete_job(&self, id: &str) -> Result<()> {
        debug!(id, "Deleting job");
        if self.writes.is_closed() {
            return Err(StoreError::Closed.into());
        }
        let mut commands: Vec<Command> = Outcome::ALL
            .iter()
            .map(|outcome| Command::ZRem {
                key: outcome.index_key(),
                member: id.to_string(),
            })
            .collect();
        commands.push(Command::Delete { key: result_key(id) });

        self.store.execute(commands).await?;
        self.metrics.job_deleted();
        Ok(())
    }

    /// Run one purge cycle with the configured retention window.
    /// Returns `None` when no window is configured.
    pub async fn purge_metadata(&self) -> Result<Option<PurgeStats>> {
        if self.options.meta_expiry.is_zero() {
            return Ok(None);
        }
        self.purge_older_than(self.options.meta_expiry).await.map(Some)
    }

    /// Run one purge cycle removing index entries older than `window`
    pub async fn purge_older_than(&self, window: Duration) -> Result<PurgeStats> {
        MetadataPurger::new(
            self.store.clone(),
            self.writes.clone(),
            self.clock.clone(),
            window,
            self.metrics.clone(),
        )
        .purge_once()
        .await
    }

    /// Send queued writes now instead of waiting for the next tick.
    /// Returns the number of commands sent; always zero without batching.
    pub async fn flush(&self) -> Result<usize> {
        match self.writes.pipeline() {
            Some(pipeline) => Ok(pipeline.exec().await?),
            None => Ok(0),
        }
    }

    /// Commands waiting for the next flush
    pub fn pending(&self) -> usize {
        self.writes.pipeline().map_or(0, |pipeline| pipeline.len())
    }

    pub fn is_batched(&self) -> bool {
        self.writes.pipeline().is_some()
    }

    pub fn options(&self) -> &ResultOptions {
        &self.options
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.ping().await?;
        Ok(())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Drain queued writes, stop the background loops and release the store.
    ///
    /// Writes attempted afterwards fail with [`StoreError::Closed`]; reads
    /// keep going to the store. Later calls are no-ops.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(supervisor) = self.supervisor.lock().await.take() else {
            return Ok(());
        };
        info!("Shutting down result store");
        supervisor.shutdown().await;
        self.writes.close();
        self.store.close().await?;
        Ok(())
    }
}
