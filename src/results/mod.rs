//! Job result store with success/failed outcome indexes
//!
//! This module is what job producers and consumers talk to. It keeps:
//!
//! - Result payloads, one key per job, with an optional TTL
//! - Two sorted-set indexes of job ids (success, failed) scored by the
//!   nanosecond time the outcome was recorded
//!
//! ## Background loops
//!
//! - **Pipe flusher** (when `pipe_period` is non-zero): writes are queued
//!   into a shared pipeline and sent as one atomic batch per tick. Readers see
//!   a batched write after the next tick at the latest.
//! - **Metadata purger** (when `meta_expiry` is non-zero): every
//!   `meta_expiry`, index entries older than `meta_expiry` are removed.
//!
//! Both loops belong to a [`Supervisor`] and stop on
//! [`ResultStore::shutdown`]: pipe drained first, purger stopped second,
//! store released last.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resultbox::backend::MemoryStore;
//! use resultbox::results::{ResultOptions, ResultStore};
//!
//! let store = ResultStore::new(Arc::new(MemoryStore::new()), ResultOptions::default());
//! store.set("job-1", "ok").await?;
//! store.set_success("job-1").await?;
//! let recent = store.get_success().await?;
//! ```

pub mod error;
pub mod flusher;
pub mod keys;
pub mod purger;
pub mod store;
pub mod supervisor;
pub mod writer;

pub use error::{Result, ResultError};
pub use flusher::PipeFlusher;
pub use keys::{result_key, Outcome, RESULT_PREFIX};
pub use purger::{MetadataPurger, PurgeStats};
pub use store::{ResultOptions, ResultStore};
pub use supervisor::Supervisor;
pub use writer::{BatchedWrites, DirectWrites, WritePath};
