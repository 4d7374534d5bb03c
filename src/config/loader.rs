//! Configuration Loader
//!
//! Layers defaults, an optional configuration file and environment variables
//! with the `config` crate, then validates the merged result.

use super::error::{ConfigResult, ConfigurationError};
use super::SummaryCacheConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SUMMARY_CACHE";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "SUMMARY_CACHE_CONFIG";

/// Loaded, validated configuration plus the environment it was loaded for
#[derive(Debug)]
pub struct ConfigManager {
    config: SummaryCacheConfig,
    environment: String,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    ///
    /// Reads the file named by `SUMMARY_CACHE_CONFIG` when set, otherwise
    /// `config/summary-cache.<environment>.toml` if it exists.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        let path = env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let candidate =
                    PathBuf::from(format!("config/summary-cache.{environment}.toml"));
                candidate.exists().then_some(candidate)
            });

        Self::load_from_sources(path.as_deref(), ENV_PREFIX, &environment)
    }

    /// Load configuration from a specific file, with environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_sources(Some(path.as_ref()), ENV_PREFIX, &environment)
    }

    /// Load configuration from explicit sources
    ///
    /// Useful for tests that must not depend on the process environment:
    /// pass a prefix no other test uses.
    pub fn load_from_sources(
        path: Option<&Path>,
        env_prefix: &str,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let defaults = config::Config::try_from(&SummaryCacheConfig::default())
            .map_err(|e| ConfigurationError::load_error("defaults", e))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigurationError::load_error(
                    path.display().to_string(),
                    "file does not exist",
                ));
            }
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let source_name = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("{env_prefix}_* environment"));

        let config: SummaryCacheConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigurationError::load_error(source_name.clone(), e))?;

        config.validate()?;

        info!(
            environment = environment,
            source = %source_name,
            store_backend = ?config.store.backend,
            cache_ttl_hours = config.cache.ttl_hours,
            lock_timeout_seconds = config.single_flight.lock_timeout_seconds,
            in_flight_timeout_seconds = config.single_flight.in_flight_timeout_seconds,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            source_file: path.map(Path::to_path_buf),
        }))
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(config: SummaryCacheConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            source_file: None,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &SummaryCacheConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Current environment from `SUMMARY_CACHE_ENV` or `APP_ENV`
    pub fn detect_environment() -> String {
        env::var("SUMMARY_CACHE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let manager =
            ConfigManager::load_from_sources(None, "SUMMARY_CACHE_TEST_NONE", "test").unwrap();
        assert_eq!(manager.config(), &SummaryCacheConfig::default());
        assert_eq!(manager.environment(), "test");
        assert!(manager.source_file().is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[store]
backend = "memory"

[cache]
ttl_hours = 6

[single_flight]
lock_timeout_seconds = 60
in_flight_timeout_seconds = 20
"#
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_sources(Some(file.path()), "SUMMARY_CACHE_TEST_FILE", "test")
                .unwrap();
        let config = manager.config();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.cache.ttl_hours, 6);
        assert_eq!(config.single_flight.lock_timeout_seconds, 60);
        assert_eq!(config.single_flight.in_flight_timeout_seconds, 20);
        // untouched keys keep their defaults
        assert_eq!(config.single_flight.poll_initial_ms, 20);
        assert_eq!(config.cache.key_prefix, "summary");
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[single_flight]\nresult_ttl_seconds = 45").unwrap();

        env::set_var("SUMMARY_CACHE_TEST_ENV_SINGLE_FLIGHT__RESULT_TTL_SECONDS", "90");
        let manager =
            ConfigManager::load_from_sources(Some(file.path()), "SUMMARY_CACHE_TEST_ENV", "test");
        env::remove_var("SUMMARY_CACHE_TEST_ENV_SINGLE_FLIGHT__RESULT_TTL_SECONDS");

        assert_eq!(manager.unwrap().config().single_flight.result_ttl_seconds, 90);
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[single_flight]\nlock_timeout_seconds = 10\nin_flight_timeout_seconds = 10"
        )
        .unwrap();

        let result = ConfigManager::load_from_sources(
            Some(file.path()),
            "SUMMARY_CACHE_TEST_INVALID",
            "test",
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ConfigManager::load_from_sources(
            Some(Path::new("/definitely/not/here.toml")),
            "SUMMARY_CACHE_TEST_MISSING",
            "test",
        );
        assert!(matches!(result, Err(ConfigurationError::LoadError { .. })));
    }
}
