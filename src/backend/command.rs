use std::time::Duration;

use bytes::Bytes;

/// A single mutating store command.
///
/// Commands are either executed on their own or queued into a
/// [`Pipeline`](super::Pipeline) and executed later as one atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Write a byte value, optionally expiring after `ttl`
    Set {
        key: String,
        value: Bytes,
        ttl: Option<Duration>,
    },
    /// Delete a key of any type. Absent keys are not an error.
    Delete { key: String },
    /// Add `member` to a sorted set, replacing its score if already present
    ZAdd {
        key: String,
        member: String,
        score: i64,
    },
    /// Remove `member` from a sorted set
    ZRem { key: String, member: String },
    /// Remove every member whose score lies in `[min, max]`
    ZRemRangeByScore { key: String, min: i64, max: i64 },
}

impl Command {
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. }
            | Command::Delete { key }
            | Command::ZAdd { key, .. }
            | Command::ZRem { key, .. }
            | Command::ZRemRangeByScore { key, .. } => key,
        }
    }

    /// Wire name of the command, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Delete { .. } => "DEL",
            Command::ZAdd { .. } => "ZADD",
            Command::ZRem { .. } => "ZREM",
            Command::ZRemRangeByScore { .. } => "ZREMRANGEBYSCORE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_and_name() {
        let cmd = Command::ZRemRangeByScore {
            key: "tq:res:failed".to_string(),
            min: 0,
            max: 42,
        };
        assert_eq!(cmd.key(), "tq:res:failed");
        assert_eq!(cmd.name(), "ZREMRANGEBYSCORE");

        let cmd = Command::Set {
            key: "tq:res:job_1".to_string(),
            value: Bytes::from_static(b"ok"),
            ttl: None,
        };
        assert_eq!(cmd.key(), "tq:res:job_1");
        assert_eq!(cmd.name(), "SET");
    }
}
