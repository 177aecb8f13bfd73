use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::command::Command;
use super::error::{Result, StoreError};
use super::RemoteStore;

/// Batching handle over a [`RemoteStore`]
///
/// Commands are queued in enqueue order and sent as one atomic round trip by
/// [`Pipeline::exec`]. The queue is guarded internally, so a single pipeline
/// can be shared by every writer and the background flusher without any
/// locking on the caller's side.
///
/// `exec` takes the queue contents before touching the network. A command
/// enqueued while a batch is in flight lands in the next batch.
///
/// Once [`Pipeline::close`] has run, `enqueue` fails with
/// [`StoreError::Closed`]. `exec` still sends whatever was queued before.
pub struct Pipeline {
    store: Arc<dyn RemoteStore>,
    queue: Mutex<Queue>,
}

#[derive(Default)]
struct Queue {
    commands: Vec<Command>,
    closed: bool,
}

impl Pipeline {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            queue: Mutex::new(Queue::default()),
        }
    }

    /// Queue a command for the next batch
    pub fn enqueue(&self, command: Command) -> Result<()> {
        let mut queue = self.lock();
        if queue.closed {
            return Err(StoreError::Closed);
        }
        debug!(command = command.name(), key = command.key(), "Command queued");
        queue.commands.push(command);
        Ok(())
    }

    /// Refuse further commands. Already queued ones stay until the next `exec`.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of commands waiting for the next batch
    pub fn len(&self) -> usize {
        self.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().commands.is_empty()
    }

    /// Execute everything queued so far as a single batch
    ///
    /// Returns the number of commands sent. On failure the batch is dropped:
    /// commands are not re-queued.
    pub async fn exec(&self) -> Result<usize> {
        let batch = std::mem::take(&mut self.lock().commands);
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        self.store.execute(batch).await?;
        debug!(count, "Pipeline executed");
        Ok(count)
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.lock();
        f.debug_struct("Pipeline")
            .field("queued", &queue.commands.len())
            .field("closed", &queue.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::Notify;

    /// Memory backend whose `execute` parks until released, recording the
    /// keys of every batch it receives
    struct GatedStore {
        inner: MemoryStore,
        entered: Notify,
        release: Notify,
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                entered: Notify::new(),
                release: Notify::new(),
                batches: Mutex::new(Vec::new()),
            }
        }

        fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteStore for GatedStore {
        async fn get(&self, key: &str) -> Result<Option<Bytes>> {
            self.inner.get(key).await
        }

        async fn zrevrange_by_score(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>> {
            self.inner.zrevrange_by_score(key, min, max).await
        }

        async fn execute(&self, commands: Vec<Command>) -> Result<()> {
            let keys = commands.iter().map(|c| c.key().to_string()).collect();
            self.batches.lock().unwrap().push(keys);
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.execute(commands).await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn set(key: &str, value: &'static [u8]) -> Command {
        Command::Set {
            key: key.to_string(),
            value: Bytes::from_static(value),
            ttl: None,
        }
    }

    #[tokio::test]
    async fn test_queued_commands_are_invisible_until_exec() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(store.clone());

        pipeline.enqueue(set("a", b"1")).unwrap();
        pipeline.enqueue(set("b", b"2")).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert!(store.get("a").await.unwrap().is_none());

        let sent = pipeline.exec().await.unwrap();
        assert_eq!(sent, 2);
        assert!(pipeline.is_empty());
        assert_eq!(store.get("a").await.unwrap().unwrap(), Bytes::from_static(b"1"));
        assert_eq!(store.get("b").await.unwrap().unwrap(), Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn test_exec_preserves_enqueue_order() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(store.clone());

        pipeline.enqueue(set("k", b"first")).unwrap();
        pipeline
            .enqueue(Command::Delete {
                key: "k".to_string(),
            })
            .unwrap();
        pipeline.enqueue(set("k", b"last")).unwrap();
        pipeline.exec().await.unwrap();

        assert_eq!(store.get("k").await.unwrap().unwrap(), Bytes::from_static(b"last"));
    }

    #[tokio::test]
    async fn test_exec_on_empty_queue_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(store);
        assert_eq!(pipeline.exec().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_command_enqueued_during_exec_waits_for_next_batch() {
        let store = Arc::new(GatedStore::new());
        let pipeline = Arc::new(Pipeline::new(store.clone()));
        pipeline.enqueue(set("early", b"1")).unwrap();

        let in_flight = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.exec().await }
        });
        store.entered.notified().await;

        pipeline.enqueue(set("late", b"2")).unwrap();
        assert_eq!(pipeline.len(), 1);

        store.release.notify_one();
        assert_eq!(in_flight.await.unwrap().unwrap(), 1);
        assert_eq!(store.batches(), vec![vec!["early".to_string()]]);
        assert!(store.get("late").await.unwrap().is_none());
        assert_eq!(pipeline.len(), 1);

        store.release.notify_one();
        assert_eq!(pipeline.exec().await.unwrap(), 1);
        assert_eq!(
            store.batches(),
            vec![vec!["early".to_string()], vec!["late".to_string()]]
        );
        assert!(pipeline.is_empty());
        assert_eq!(store.get("late").await.unwrap().unwrap(), Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn test_closed_pipeline_rejects_commands_but_still_drains() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(store.clone());

        pipeline.enqueue(set("a", b"1")).unwrap();
        pipeline.close();
        assert!(pipeline.is_closed());
        assert!(matches!(pipeline.enqueue(set("b", b"2")), Err(StoreError::Closed)));
        assert_eq!(pipeline.len(), 1);

        assert_eq!(pipeline.exec().await.unwrap(), 1);
        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
    }
}
