//! Redis backend
//!
//! Uses a multiplexed tokio [`ConnectionManager`], which reconnects on its own
//! and is safe to clone across tasks. Batches are sent as `MULTI`/`EXEC`
//! pipelines so they apply atomically and in order.
//!
//! Only single-node deployments are supported: configuration validation
//! rejects more than one address.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::IntoConnectionInfo;
use tracing::{debug, info};

use super::command::Command;
use super::error::{Result, StoreError};
use super::RemoteStore;
use crate::config::StoreConfig;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect using the endpoint, credentials and timeouts from `config`
    ///
    /// The dial timeout bounds connection setup; the larger of the read and
    /// write timeouts bounds each round trip. `idle_timeout` and
    /// `min_idle_conns` only matter for pooled clients and are not used by the
    /// multiplexed connection.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let addr = config
            .addrs
            .first()
            .ok_or_else(|| StoreError::Unavailable("no redis address configured".to_string()))?;

        let mut info = format!("redis://{addr}").into_connection_info()?;
        info.redis.db = config.db;
        info.redis.password = config.password.clone();

        let client = redis::Client::open(info)?;
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.dial_timeout.as_duration())
            .set_response_timeout(
                config
                    .read_timeout
                    .as_duration()
                    .max(config.write_timeout.as_duration()),
            );
        let conn = ConnectionManager::new_with_config(client, manager_config).await?;

        info!(%addr, db = config.db, "Connected to redis");
        Ok(Self { conn })
    }
}

/// Longest `PX` accepted here; Redis rejects expiries that overflow its
/// millisecond clock
const MAX_TTL_MILLIS: u64 = i64::MAX as u64 / 2;

/// Expiry in milliseconds for `SET .. PX`
///
/// Redis rejects `PX 0`, so sub-millisecond expiries round up to 1ms. A TTL
/// too long for Redis to represent yields `None`: the value never expires.
fn ttl_millis(ttl: Duration) -> Option<u64> {
    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    (millis <= MAX_TTL_MILLIS).then(|| millis.max(1))
}

/// Build an atomic pipeline for `commands`, replies discarded
pub(crate) fn build_pipeline(commands: &[Command]) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();

    for command in commands {
        match command {
            Command::Set { key, value, ttl } => {
                let cmd = pipe.cmd("SET").arg(key).arg(&value[..]);
                if let Some(millis) = ttl.and_then(ttl_millis) {
                    cmd.arg("PX").arg(millis);
                }
                cmd.ignore();
            }
            Command::Delete { key } => {
                pipe.cmd("DEL").arg(key).ignore();
            }
            Command::ZAdd { key, member, score } => {
                pipe.cmd("ZADD").arg(key).arg(*score).arg(member).ignore();
            }
            Command::ZRem { key, member } => {
                pipe.cmd("ZREM").arg(key).arg(member).ignore();
            }
            Command::ZRemRangeByScore { key, min, max } => {
                pipe.cmd("ZREMRANGEBYSCORE")
                    .arg(key)
                    .arg(*min)
                    .arg(*max)
                    .ignore();
            }
        }
    }

    pipe
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value.map(Bytes::from))
    }

    async fn zrevrange_by_score(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("ZREVRANGEBYSCORE")
            .arg(key)
            .arg(max)
            .arg(min)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn execute(&self, commands: Vec<Command>) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let () = build_pipeline(&commands).query_async(&mut conn).await?;
        debug!(count = commands.len(), "Redis pipeline executed");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
