//! Fjall-backed embedded store
//!
//! Single-node stand-in for Redis: byte values with expiry and scored sets
//! live in three partitions of one keyspace (see [`super::keys`]).
//!
//! An `execute` call is folded into one [`Staged`] view of the keys it
//! touches and committed as a single Fjall batch under the store's write
//! lock. Either every command of the call lands or none does, and readers
//! never observe half of it.
//!
//! Expired values are hidden on read and physically removed by
//! [`RemoteStore::evict_expired`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::command::Command;
use super::error::{Result, StoreError};
use super::keys::{
    decode_score, decode_score_key, decode_value, encode_member_key, encode_score,
    encode_score_key, encode_set_prefix, encode_value,
};
use super::RemoteStore;

pub struct FjallStore {
    keyspace: Keyspace,
    values: PartitionHandle,
    scores: PartitionHandle,
    members: PartitionHandle,
    lock: RwLock<()>,
}

/// Persisted and pending score of one sorted-set member
#[derive(Debug, Clone, Copy)]
struct MemberState {
    stored: Option<i64>,
    pending: Option<i64>,
}

/// Final state of every key touched by one `execute` call
///
/// A Fjall batch must not write the same key twice, so commands are applied
/// to this view first and only the net change per key is committed.
struct Staged<'a> {
    store: &'a FjallStore,
    now: u64,
    /// `Some` = insert this encoded value, `None` = remove
    values: HashMap<String, Option<Vec<u8>>>,
    sets: HashMap<String, HashMap<String, MemberState>>,
    /// Sets whose persisted members are all in `sets` already
    loaded: HashSet<String>,
}

impl<'a> Staged<'a> {
    fn new(store: &'a FjallStore, now: u64) -> Self {
        Self {
            store,
            now,
            values: HashMap::new(),
            sets: HashMap::new(),
            loaded: HashSet::new(),
        }
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Set { key, value, ttl } => {
                self.clear_set(&key)?;
                let expires_at = match ttl {
                    Some(ttl) => {
                        let nanos = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
                        self.now.saturating_add(nanos).max(1)
                    }
                    None => 0,
                };
                self.values.insert(key, Some(encode_value(expires_at, &value)));
            }
            Command::Delete { key } => {
                self.clear_set(&key)?;
                self.values.insert(key, None);
            }
            Command::ZAdd { key, member, score } => {
                self.values.insert(key.clone(), None);
                self.member(&key, &member)?.pending = Some(score);
            }
            Command::ZRem { key, member } => {
                self.member(&key, &member)?.pending = None;
            }
            Command::ZRemRangeByScore { key, min, max } => {
                let mut removed = 0usize;
                for state in self.load_set(&key)?.values_mut() {
                    if matches!(state.pending, Some(score) if score >= min && score <= max) {
                        state.pending = None;
                        removed += 1;
                    }
                }
                debug!(key, removed, "Removed sorted set range");
            }
        }
        Ok(())
    }

    /// Staged state of one member, read from disk on first touch
    fn member(&mut self, key: &str, member: &str) -> Result<&mut MemberState> {
        let store = self.store;
        let set = self.sets.entry(key.to_string()).or_default();
        match set.entry(member.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let stored = match store.members.get(encode_member_key(key, member))? {
                    Some(raw) => Some(store.decode_member_score(key, &raw)?),
                    None => None,
                };
                Ok(entry.insert(MemberState {
                    stored,
                    pending: stored,
                }))
            }
        }
    }

    /// Staged view of a whole set, merging every persisted member in
    fn load_set(&mut self, key: &str) -> Result<&mut HashMap<String, MemberState>> {
        if !self.loaded.contains(key) {
            let persisted = self.store.scan_set(key)?;
            let set = self.sets.entry(key.to_string()).or_default();
            for (score, member) in persisted {
                set.entry(member).or_insert(MemberState {
                    stored: Some(score),
                    pending: Some(score),
                });
            }
            self.loaded.insert(key.to_string());
        }
        Ok(self.sets.entry(key.to_string()).or_default())
    }

    fn clear_set(&mut self, key: &str) -> Result<()> {
        for state in self.load_set(key)?.values_mut() {
            state.pending = None;
        }
        Ok(())
    }

    fn commit(self) -> Result<()> {
        let store = self.store;
        let mut batch = store.keyspace.batch();

        for (key, value) in self.values {
            match value {
                Some(value) => batch.insert(&store.values, key.into_bytes(), value),
                None => batch.remove(&store.values, key.into_bytes()),
            }
        }

        for (key, set) in self.sets {
            for (member, state) in set {
                if let Some(old) = state.stored {
                    if state.pending != Some(old) {
                        batch.remove(&store.scores, encode_score_key(&key, old, &member));
                    }
                }
                match state.pending {
                    Some(score) => {
                        batch.insert(&store.scores, encode_score_key(&key, score, &member), Vec::new());
                        batch.insert(
                            &store.members,
                            encode_member_key(&key, &member),
                            encode_score(score).to_vec(),
                        );
                    }
                    None if state.stored.is_some() => {
                        batch.remove(&store.members, encode_member_key(&key, &member));
                    }
                    None => {}
                }
            }
        }

        batch.commit()?;
        Ok(())
    }
}

impl FjallStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall result store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let values = keyspace.open_partition("values", PartitionCreateOptions::default())?;
        let scores = keyspace.open_partition("scores", PartitionCreateOptions::default())?;
        let members = keyspace.open_partition("members", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            values,
            scores,
            members,
            lock: RwLock::new(()),
        })
    }

    /// All (score, member) pairs of a set in ascending score order
    fn scan_set(&self, key: &str) -> Result<Vec<(i64, String)>> {
        let mut entries = Vec::new();
        for item in self.scores.prefix(encode_set_prefix(key)) {
            let (raw, _) = item?;
            entries.push(self.decode_entry(key, &raw)?);
        }
        Ok(entries)
    }

    fn decode_entry(&self, key: &str, raw: &[u8]) -> Result<(i64, String)> {
        decode_score_key(key, raw).ok_or_else(|| StoreError::Corrupt {
            key: key.to_string(),
            reason: "malformed score entry".to_string(),
        })
    }

    fn decode_member_score(&self, key: &str, raw: &[u8]) -> Result<i64> {
        decode_score(raw).ok_or_else(|| StoreError::Corrupt {
            key: key.to_string(),
            reason: "malformed member score".to_string(),
        })
    }
}

fn now_nanos() -> u64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos().max(0) as u64
}

fn is_expired(expires_at: u64, now: u64) -> bool {
    expires_at != 0 && expires_at <= now
}

#[async_trait]
impl RemoteStore for FjallStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let _guard = self.lock.read().await;
        let Some(raw) = self.values.get(key.as_bytes())? else {
            return Ok(None);
        };
        let (expires_at, payload) = decode_value(&raw).ok_or_else(|| StoreError::Corrupt {
            key: key.to_string(),
            reason: "value shorter than expiry header".to_string(),
        })?;
        if is_expired(expires_at, now_nanos()) {
            return Ok(None);
        }
        Ok(Some(Bytes::copy_from_slice(payload)))
    }

    async fn zrevrange_by_score(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>> {
        let _guard = self.lock.read().await;
        let mut members = Vec::new();
        for item in self.scores.prefix(encode_set_prefix(key)).rev() {
            let (raw, _) = item?;
            let (score, member) = self.decode_entry(key, &raw)?;
            if score > max {
                continue;
            }
            if score < min {
                break;
            }
            members.push(member);
        }
        Ok(members)
    }

    async fn execute(&self, commands: Vec<Command>) -> Result<()> {
        let _guard = self.lock.write().await;
        let mut staged = Staged::new(self, now_nanos());
        for command in commands {
            staged.apply(command)?;
        }
        staged.commit()
    }

    async fn ping(&self) -> Result<()> {
        let _guard = self.lock.read().await;
        let _ = self.values.first_key_value()?;
        Ok(())
    }

    async fn evict_expired(&self) -> Result<usize> {
        let _guard = self.lock.write().await;
        let now = now_nanos();
        let mut batch = self.keyspace.batch();
        let mut evicted = 0;

        for item in self.values.iter() {
            let (key, value) = item?;
            if let Some((expires_at, _)) = decode_value(&value) {
                if is_expired(expires_at, now) {
                    batch.remove(&self.values, key);
                    evicted += 1;
                }
            }
        }

        batch.commit()?;
        if evicted > 0 {
            info!(evicted, "Evicted expired results");
        }
        Ok(evicted)
    }

    async fn close(&self) -> Result<()> {
        let _guard = self.lock.write().await;
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        info!("Fjall result store persisted");
        Ok(())
    }
}
