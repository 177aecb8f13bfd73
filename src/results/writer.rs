//! Write paths for mutating result operations
//!
//! The path is chosen once when the store is built: [`DirectWrites`] sends
//! every command as its own round trip, [`BatchedWrites`] queues it into the
//! shared [`Pipeline`] for the flusher to send later.
//!
//! After `close`, both paths reject commands with [`StoreError::Closed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{Command, Pipeline, RemoteStore, Result, StoreError};

#[async_trait]
pub trait WritePath: Send + Sync {
    /// Send or queue a single command
    async fn submit(&self, command: Command) -> Result<()>;

    /// The batching handle, when writes are batched
    fn pipeline(&self) -> Option<&Arc<Pipeline>> {
        None
    }

    fn mode(&self) -> &'static str;

    /// Stop accepting commands
    fn close(&self);

    fn is_closed(&self) -> bool;
}

pub struct DirectWrites {
    store: Arc<dyn RemoteStore>,
    closed: AtomicBool,
}

impl DirectWrites {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl WritePath for DirectWrites {
    async fn submit(&self, command: Command) -> Result<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        self.store.execute(vec![command]).await
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn mode(&self) -> &'static str {
        "direct"
    }
}

pub struct BatchedWrites {
    pipeline: Arc<Pipeline>,
}

impl BatchedWrites {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl WritePath for BatchedWrites {
    async fn submit(&self, command: Command) -> Result<()> {
        self.pipeline.enqueue(command)
    }

    fn close(&self) {
        self.pipeline.close();
    }

    fn is_closed(&self) -> bool {
        self.pipeline.is_closed()
    }

    fn pipeline(&self) -> Option<&Arc<Pipeline>> {
        Some(&self.pipeline)
    }

    fn mode(&self) -> &'static str {
        "batched"
    }
}

/// Pick the write path for a flush period; zero disables batching
pub fn select(store: Arc<dyn RemoteStore>, pipe_period: Duration) -> Arc<dyn WritePath> {
    if pipe_period.is_zero() {
        Arc::new(DirectWrites::new(store))
    } else {
        Arc::new(BatchedWrites::new(Arc::new(Pipeline::new(store))))
    }
}
