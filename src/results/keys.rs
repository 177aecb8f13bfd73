//! Key layout in the backing store:
//! - `tq:res:{job_id}` -> result payload (bytes, optional TTL)
//! - `tq:res:success`  -> sorted set of job ids scored by completion time (ns)
//! - `tq:res:failed`   -> sorted set of job ids scored by completion time (ns)
//!
//! Result keys and index keys share the prefix, so a job literally named
//! `success` or `failed` collides with an index. Ids are opaque and this
//! layout is kept for compatibility with existing deployments.

use std::fmt;
use std::str::FromStr;

pub const RESULT_PREFIX: &str = "tq:res:";
pub const SUCCESS_SUFFIX: &str = "success";
pub const FAILED_SUFFIX: &str = "failed";

/// Encode a result key: tq:res:{job_id}
pub fn result_key(job_id: &str) -> String {
    format!("{}{}", RESULT_PREFIX, job_id)
}

/// How a job finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    pub const ALL: [Outcome; 2] = [Outcome::Success, Outcome::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => SUCCESS_SUFFIX,
            Outcome::Failed => FAILED_SUFFIX,
        }
    }

    /// Sorted set holding this outcome's job ids
    pub fn index_key(&self) -> String {
        format!("{}{}", RESULT_PREFIX, self.as_str())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" | "succeeded" | "ok" => Ok(Outcome::Success),
            "failed" | "failure" | "error" => Ok(Outcome::Failed),
            other => Err(format!("unknown outcome '{}', expected 'success' or 'failed'", other)),
        }
    }
}
