use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub results: ResultsConfig,
}

/// Which backend holds results and outcome indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Fjall,
    Memory,
}

/// Store connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_addrs")]
    pub addrs: Vec<String>,
    /// Redis password (loaded from environment, not from config file)
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(default)]
    pub db: i64,
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout: HumanDuration,
    #[serde(default = "default_read_timeout")]
    pub read_timeout: HumanDuration,
    #[serde(default = "default_write_timeout")]
    pub write_timeout: HumanDuration,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: HumanDuration,
    #[serde(default)]
    pub min_idle_conns: usize,
    /// Keyspace location for the fjall backend
    #[serde(default = "default_fjall_path")]
    pub fjall_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            addrs: default_addrs(),
            password: None,
            db: 0,
            dial_timeout: default_dial_timeout(),
            read_timeout: default_read_timeout(),
            write_timeout: default_write_timeout(),
            idle_timeout: default_idle_timeout(),
            min_idle_conns: 0,
            fjall_path: default_fjall_path(),
        }
    }
}

fn default_addrs() -> Vec<String> {
    vec!["127.0.0.1:6379".to_string()]
}

fn default_dial_timeout() -> HumanDuration {
    HumanDuration::from_secs(5)
}

fn default_read_timeout() -> HumanDuration {
    HumanDuration::from_secs(3)
}

fn default_write_timeout() -> HumanDuration {
    HumanDuration::from_secs(3)
}

fn default_idle_timeout() -> HumanDuration {
    HumanDuration::from_secs(300)
}

fn default_fjall_path() -> PathBuf {
    PathBuf::from("data/results")
}

/// Result retention and batching
///
/// All three durations default to zero: results never expire, the purger
/// does not run and writes go straight to the store.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResultsConfig {
    /// Time-to-live of each job result record
    #[serde(default)]
    pub expiry: HumanDuration,
    /// Age after which outcome index entries are purged
    #[serde(default)]
    pub meta_expiry: HumanDuration,
    /// Batch flush interval; zero sends every write immediately
    #[serde(default)]
    pub pipe_period: HumanDuration,
}
