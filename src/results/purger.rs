use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::error::Result;
use super::keys::Outcome;
use super::writer::WritePath;
use crate::backend::{Command, RemoteStore};
use crate::clock::{duration_nanos, Clock};
use crate::observability::ResultMetrics;

/// Outcome of one purge cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    /// Entries scored at or below this timestamp (ns) were removed
    pub cutoff: i64,
    /// Result values dropped by backends without native expiry
    pub values_evicted: usize,
}

/// Trims outcome index entries older than the retention window
///
/// Removals go through the store's write path, so with batching enabled
/// they only reach the store on the next pipe flush.
pub struct MetadataPurger {
    store: Arc<dyn RemoteStore>,
    writes: Arc<dyn WritePath>,
    clock: Arc<dyn Clock>,
    window: Duration,
    metrics: Arc<ResultMetrics>,
}

impl MetadataPurger {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        writes: Arc<dyn WritePath>,
        clock: Arc<dyn Clock>,
        window: Duration,
        metrics: Arc<ResultMetrics>,
    ) -> Self {
        Self {
            store,
            writes,
            clock,
            window,
            metrics,
        }
    }

    /// Run one purge cycle against the current time
    pub async fn purge_once(&self) -> Result<PurgeStats> {
        let cutoff = self
            .clock
            .now_nanos()
            .saturating_sub(duration_nanos(self.window));

        // Both indexes are attempted even if the first removal fails
        let mut first_error = None;
        for outcome in [Outcome::Failed, Outcome::Success] {
            debug!(cutoff, outcome = %outcome, "Purging results metadata");
            let removal = self
                .writes
                .submit(Command::ZRemRangeByScore {
                    key: outcome.index_key(),
                    min: 0,
                    max: cutoff,
                })
                .await;
            if let Err(e) = removal {
                error!(error = %e, outcome = %outcome, "Could not expire results metadata");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            self.metrics.purge_failed();
            return Err(e.into());
        }

        let values_evicted = match self.store.evict_expired().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Could not evict expired results");
                self.metrics.purge_failed();
                return Err(e.into());
            }
        };
        self.metrics.purge_completed();
        Ok(PurgeStats {
            cutoff,
            values_evicted,
        })
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(ttl = ?self.window, "Starting results meta purger");

        let mut ticker = interval_at(Instant::now() + self.window, self.window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(ttl = ?self.window, "Shutting down results meta purger");
                    return;
                }
                _ = ticker.tick() => {
                    // Failures are logged inside purge_once or here; the loop keeps going
                    if let Err(e) = self.purge_once().await {
                        debug!(error = %e, "Purge cycle failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryStore, StoreError};
    use crate::clock::ManualClock;
    use crate::results::writer;
    use async_trait::async_trait;
    use bytes::Bytes;

    /// Memory backend whose expiry sweep always fails
    #[derive(Default)]
    struct BrokenEviction {
        inner: MemoryStore,
    }

    #[async_trait]
    impl RemoteStore for BrokenEviction {
        async fn get(&self, key: &str) -> crate::backend::Result<Option<Bytes>> {
            self.inner.get(key).await
        }

        async fn zrevrange_by_score(
            &self,
            key: &str,
            min: i64,
            max: i64,
        ) -> crate::backend::Result<Vec<String>> {
            self.inner.zrevrange_by_score(key, min, max).await
        }

        async fn execute(&self, commands: Vec<Command>) -> crate::backend::Result<()> {
            self.inner.execute(commands).await
        }

        async fn ping(&self) -> crate::backend::Result<()> {
            Ok(())
        }

        async fn evict_expired(&self) -> crate::backend::Result<usize> {
            Err(StoreError::Unavailable("sweep failed".to_string()))
        }
    }

    const HOUR: Duration = Duration::from_secs(3600);
    const START: i64 = 1_700_000_000_000_000_000;

    fn purger_for(
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        pipe_period: Duration,
    ) -> (MetadataPurger, Arc<dyn WritePath>) {
        let writes = writer::select(store.clone(), pipe_period);
        let purger = MetadataPurger::new(
            store,
            writes.clone(),
            clock,
            HOUR,
            Arc::new(ResultMetrics::new()),
        );
        (purger, writes)
    }

    #[tokio::test]
    async fn test_purge_removes_only_old_entries() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let (purger, _) = purger_for(store.clone(), clock.clone(), Duration::ZERO);

        let success = Outcome::Success.index_key();
        let failed = Outcome::Failed.index_key();
        store.zadd(&success, "old_ok", START).await.unwrap();
        store.zadd(&failed, "old_err", START).await.unwrap();
        store
            .zadd(&success, "new_ok", START + duration_nanos(HOUR))
            .await
            .unwrap();

        clock.advance(HOUR + Duration::from_secs(1));
        let stats = purger.purge_once().await.unwrap();
        assert_eq!(stats.cutoff, START + duration_nanos(Duration::from_secs(1)));

        assert_eq!(
            store.zrevrange_by_score(&success, 0, i64::MAX).await.unwrap(),
            vec!["new_ok"]
        );
        assert!(store.zrevrange_by_score(&failed, 0, i64::MAX).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batched_purge_waits_for_flush() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let (purger, writes) = purger_for(store.clone(), clock.clone(), Duration::from_secs(1));

        let failed = Outcome::Failed.index_key();
        store.zadd(&failed, "old_err", START).await.unwrap();

        clock.advance(HOUR * 2);
        purger.purge_once().await.unwrap();
        assert_eq!(
            store.zrevrange_by_score(&failed, 0, i64::MAX).await.unwrap(),
            vec!["old_err"]
        );

        let pipeline = writes.pipeline().unwrap();
        assert_eq!(pipeline.len(), 2);
        pipeline.exec().await.unwrap();
        assert!(store.zrevrange_by_score(&failed, 0, i64::MAX).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_purges_on_each_tick_and_stops_on_cancel() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let (purger, _) = purger_for(store.clone(), clock.clone(), Duration::ZERO);
        let success = Outcome::Success.index_key();
        store.zadd(&success, "job", START).await.unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(purger.run(cancel.clone()));

        // Wall clock past the window, but no tick yet
        clock.advance(HOUR * 2);
        tokio::time::sleep(HOUR / 2).await;
        assert_eq!(
            store.zrevrange_by_score(&success, 0, i64::MAX).await.unwrap(),
            vec!["job"]
        );

        tokio::time::sleep(HOUR).await;
        assert!(store.zrevrange_by_score(&success, 0, i64::MAX).await.unwrap().is_empty());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_eviction_counts_as_purge_failure() {
        let store = Arc::new(BrokenEviction::default());
        let clock = Arc::new(ManualClock::new(START));
        let metrics = Arc::new(ResultMetrics::new());
        let writes = writer::select(store.clone(), Duration::ZERO);
        let purger = MetadataPurger::new(store.clone(), writes, clock.clone(), HOUR, metrics.clone());

        let success = Outcome::Success.index_key();
        store.zadd(&success, "old_ok", START).await.unwrap();
        clock.advance(HOUR * 2);

        let err = purger.purge_once().await.unwrap_err();
        assert!(matches!(
            err,
            crate::results::ResultError::Store(StoreError::Unavailable(_))
        ));

        // Index trimming already happened; only the sweep failed
        assert!(store.zrevrange_by_score(&success, 0, i64::MAX).await.unwrap().is_empty());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.purge_failures, 1);
        assert_eq!(snapshot.purge_cycles, 0);
    }
}
