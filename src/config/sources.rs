use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "RESULTBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/resultbox.toml";
const ENV_PREFIX: &str = "RESULTBOX";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load secrets from environment variables into config
/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    if let Ok(password) = env::var("RESULTBOX_REDIS_PASSWORD") {
        config.store.password = Some(password);
    }

    if config.store.password.is_none() {
        if let Ok(password) = env::var("REDIS_PASSWORD") {
            config.store.password = Some(password);
        }
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // RESULTBOX__RESULTS__PIPE_PERIOD -> results.pipe_period
    // RESULTBOX__STORE__ADDRS=a:6379,b:6379 -> store.addrs
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("store.addrs")
            .try_parsing(true),
    );

    let mut config: Config = builder.build()?.try_deserialize()?;
    load_secrets(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;
    use crate::humanize::HumanDuration;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.store.addrs, vec!["127.0.0.1:6379"]);
        assert!(config.results.pipe_period.is_zero());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[store]
addrs = ["redis.internal:6380"]
db = 3
read_timeout = "500ms"

[results]
expiry = "1h"
pipe_period = "50ms"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.addrs, vec!["redis.internal:6380"]);
        assert_eq!(config.store.db, 3);
        assert_eq!(config.store.read_timeout, HumanDuration::from_millis(500));
        assert_eq!(config.results.expiry, HumanDuration::from_secs(3600));
        assert_eq!(config.results.pipe_period, HumanDuration::from_millis(50));
    }

    // Environment overrides are not exercised here: env::set_var is unsafe
    // under edition 2024 and races with parallel tests.

    #[test]
    fn test_integer_durations_are_seconds() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[results]
meta_expiry = 3600
            "#,
        )
        .unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.results.meta_expiry, HumanDuration::from_secs(3600));
    }
}
