use super::models::{Config, StoreBackend};
use crate::humanize::HumanDuration;
use std::time::Duration;
use thiserror::Error;

/// Shortest accepted batch flush interval
const MIN_PIPE_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Redis backend requires at least one address in store.addrs")]
    MissingRedisAddress,

    #[error("Redis cluster mode is not supported ({count} addresses configured)")]
    MultipleRedisAddresses { count: usize },

    #[error("Redis database index must not be negative: {0}")]
    InvalidDatabase(i64),

    #[error("Fjall backend requires a non-empty store.fjall_path")]
    MissingFjallPath,

    #[error("Timeout must be positive: {field}")]
    InvalidTimeout { field: String },

    #[error("pipe_period ({actual}) is below the 1ms minimum")]
    PipePeriodTooShort { actual: HumanDuration },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_store(config)?;
    validate_results(config)?;
    Ok(())
}

fn validate_store(config: &Config) -> Result<(), ValidationError> {
    let store = &config.store;
    match store.backend {
        StoreBackend::Redis => {
            match store.addrs.len() {
                0 => return Err(ValidationError::MissingRedisAddress),
                1 => {}
                count => return Err(ValidationError::MultipleRedisAddresses { count }),
            }
            if store.addrs[0].trim().is_empty() {
                return Err(ValidationError::MissingRedisAddress);
            }
            if store.db < 0 {
                return Err(ValidationError::InvalidDatabase(store.db));
            }
            for (field, value) in [
                ("dial_timeout", store.dial_timeout),
                ("read_timeout", store.read_timeout),
                ("write_timeout", store.write_timeout),
            ] {
                if value.is_zero() {
                    return Err(ValidationError::InvalidTimeout {
                        field: field.to_string(),
                    });
                }
            }
        }
        StoreBackend::Fjall => {
            if store.fjall_path.as_os_str().is_empty() {
                return Err(ValidationError::MissingFjallPath);
            }
        }
        StoreBackend::Memory => {}
    }
    Ok(())
}

fn validate_results(config: &Config) -> Result<(), ValidationError> {
    let pipe_period = config.results.pipe_period;
    if !pipe_period.is_zero() && pipe_period.as_duration() < MIN_PIPE_PERIOD {
        return Err(ValidationError::PipePeriodTooShort {
            actual: pipe_period,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_default_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_missing_redis_address() {
        let mut config = Config::default();
        config.store.addrs.clear();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::MissingRedisAddress)));
    }

    #[test]
    fn test_cluster_addresses_rejected() {
        let mut config = Config::default();
        config.store.addrs = vec!["a:6379".to_string(), "b:6379".to_string()];

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::MultipleRedisAddresses { count: 2 })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.store.dial_timeout = HumanDuration::ZERO;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidTimeout { ref field }) if field == "dial_timeout"
        ));
    }

    #[test]
    fn test_negative_database_rejected() {
        let mut config = Config::default();
        config.store.db = -1;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidDatabase(-1))
        ));
    }

    #[test]
    fn test_fjall_requires_path() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Fjall;
        config.store.fjall_path = PathBuf::new();

        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingFjallPath)
        ));
    }

    #[test]
    fn test_fjall_ignores_redis_settings() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Fjall;
        config.store.addrs.clear();

        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_pipe_period_minimum() {
        let mut config = Config::default();
        config.results.pipe_period = HumanDuration(Duration::from_micros(100));

        assert!(matches!(
            validate(&config),
            Err(ValidationError::PipePeriodTooShort { .. })
        ));

        config.results.pipe_period = HumanDuration::from_millis(1);
        assert!(validate(&config).is_ok());
    }
}
