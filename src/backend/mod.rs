//! Store client layer
//!
//! The result store talks to its backing store only through the
//! [`RemoteStore`] trait: keyed byte values with expiry, sorted sets scored by
//! `i64`, and atomic execution of an ordered command batch. Three backends are
//! provided:
//!
//! - [`RedisStore`]: the production backend (`redis` crate, tokio connection manager)
//! - [`FjallStore`]: embedded single-node backend on a Fjall keyspace
//! - [`MemoryStore`]: in-process backend for tests and development
//!
//! ## Concurrency contract
//!
//! Implementations must be safe for concurrent use by many callers without
//! external locking, and `execute` must apply a batch atomically and in order.
//! [`Pipeline`] relies on this contract and adds only its own queue guard.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};

pub mod command;
pub mod error;
pub mod fjall_store;
pub mod keys;
pub mod memory;
pub mod pipeline;
pub mod redis_store;

pub use command::Command;
pub use error::{Result, StoreError};
pub use fjall_store::FjallStore;
pub use memory::MemoryStore;
pub use pipeline::Pipeline;
pub use redis_store::RedisStore;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read a byte value. Absent and expired keys yield `None`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Members of a sorted set with score in `[min, max]`, highest score first
    async fn zrevrange_by_score(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>>;

    /// Apply `commands` in order as one atomic round trip
    async fn execute(&self, commands: Vec<Command>) -> Result<()>;

    /// Round-trip health check
    async fn ping(&self) -> Result<()>;

    /// Drop values whose expiry has passed. Backends with native expiry
    /// have nothing to do here.
    async fn evict_expired(&self) -> Result<usize> {
        Ok(0)
    }

    /// Flush and release the underlying connection or keyspace
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<()> {
        self.execute(vec![Command::Set {
            key: key.to_string(),
            value,
            ttl,
        }])
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.execute(vec![Command::Delete {
            key: key.to_string(),
        }])
        .await
    }

    async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<()> {
        self.execute(vec![Command::ZAdd {
            key: key.to_string(),
            member: member.to_string(),
            score,
        }])
        .await
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        self.execute(vec![Command::ZRem {
            key: key.to_string(),
            member: member.to_string(),
        }])
        .await
    }

    async fn zrem_range_by_score(&self, key: &str, min: i64, max: i64) -> Result<()> {
        self.execute(vec![Command::ZRemRangeByScore {
            key: key.to_string(),
            min,
            max,
        }])
        .await
    }
}

/// Open the backend selected in `config`
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn RemoteStore>> {
    info!(backend = ?config.backend, "Opening result backend");
    let store: Arc<dyn RemoteStore> = match config.backend {
        StoreBackend::Redis => Arc::new(RedisStore::connect(config).await?),
        StoreBackend::Fjall => Arc::new(FjallStore::open(&config.fjall_path)?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
