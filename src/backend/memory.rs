//! In-process backend
//!
//! Mirrors the Redis semantics the result store relies on. Expiry is measured
//! on the tokio clock so paused-time tests can drive it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;

use super::command::Command;
use super::error::Result;
use super::RemoteStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, Entry>,
    sets: HashMap<String, SortedSet>,
}

#[derive(Debug)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Member -> score map plus a score-ordered view of the same entries
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, i64>,
    ordered: BTreeSet<(i64, String)>,
}

impl SortedSet {
    fn insert(&mut self, member: String, score: i64) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.ordered.remove(&(old, member.clone()));
        }
        self.ordered.insert((score, member));
    }

    fn remove(&mut self, member: &str) {
        if let Some(score) = self.scores.remove(member) {
            self.ordered.remove(&(score, member.to_string()));
        }
    }

    fn remove_range(&mut self, min: i64, max: i64) {
        if min > max {
            return;
        }
        let doomed: Vec<(i64, String)> = self
            .ordered
            .range((min, String::new())..)
            .take_while(|(score, _)| *score <= max)
            .cloned()
            .collect();
        for entry in doomed {
            self.scores.remove(&entry.1);
            self.ordered.remove(&entry);
        }
    }

    fn rev_range(&self, min: i64, max: i64) -> Vec<String> {
        self.ordered
            .iter()
            .rev()
            .skip_while(|(score, _)| *score > max)
            .take_while(|(score, _)| *score >= min)
            .map(|(_, member)| member.clone())
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl State {
    fn apply(&mut self, command: Command, now: Instant) {
        match command {
            Command::Set { key, value, ttl } => {
                self.sets.remove(&key);
                // Past the clock's range means never
                let expires_at = ttl.and_then(|ttl| now.checked_add(ttl));
                self.values.insert(key, Entry { value, expires_at });
            }
            Command::Delete { key } => {
                self.values.remove(&key);
                self.sets.remove(&key);
            }
            Command::ZAdd { key, member, score } => {
                self.values.remove(&key);
                self.sets.entry(key).or_default().insert(member, score);
            }
            Command::ZRem { key, member } => {
                if let Some(set) = self.sets.get_mut(&key) {
                    set.remove(&member);
                    if set.is_empty() {
                        self.sets.remove(&key);
                    }
                }
            }
            Command::ZRemRangeByScore { key, min, max } => {
                if let Some(set) = self.sets.get_mut(&key) {
                    set.remove_range(min, max);
                    if set.is_empty() {
                        self.sets.remove(&key);
                    }
                }
            }
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let now = Instant::now();
        let state = self.state();
        Ok(state
            .values
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn zrevrange_by_score(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>> {
        let state = self.state();
        Ok(state
            .sets
            .get(key)
            .map(|set| set.rev_range(min, max))
            .unwrap_or_default())
    }

    async fn execute(&self, commands: Vec<Command>) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state();
        for command in commands {
            state.apply(command, now);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn evict_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut state = self.state();
        let before = state.values.len();
        state.values.retain(|_, entry| !entry.is_expired(now));
        Ok(before - state.values.len())
    }
}
