//! Layered configuration loading from files and the environment

use std::env;
use std::io::Write;
use summary_cache::config::{ConfigManager, ConfigurationError, StoreBackend};
use summary_cache::store::KeyValueStore;
use summary_cache::SummaryCacheSystem;

#[test]
fn test_yaml_file_with_environment_override() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        r#"
store:
  backend: memory
cache:
  ttl_hours: 12
  key_prefix: digest
single_flight:
  lock_timeout_seconds: 45
  in_flight_timeout_seconds: 15
resilience:
  call_timeout_ms: 250
  circuit_breaker:
    failure_threshold: 3
telemetry:
  json_logs: true
"#
    )
    .unwrap();

    env::set_var("SUMMARY_CACHE_IT_YAML_CACHE__TTL_HOURS", "2");
    let manager = ConfigManager::load_from_sources(Some(file.path()), "SUMMARY_CACHE_IT_YAML", "test");
    env::remove_var("SUMMARY_CACHE_IT_YAML_CACHE__TTL_HOURS");

    let manager = manager.unwrap();
    let config = manager.config();
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.cache.ttl_hours, 2);
    assert_eq!(config.cache.key_prefix, "digest");
    assert_eq!(config.single_flight.lock_timeout_seconds, 45);
    assert_eq!(config.single_flight.in_flight_timeout_seconds, 15);
    assert_eq!(config.resilience.call_timeout_ms, 250);
    assert_eq!(config.resilience.circuit_breaker.failure_threshold, 3);
    assert_eq!(config.resilience.circuit_breaker.success_threshold, 2);
    assert!(config.telemetry.json_logs);
    assert_eq!(manager.source_file(), Some(file.path()));
}

#[test]
fn test_call_timeout_must_undercut_wait_budget() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "[single_flight]\nin_flight_timeout_seconds = 1\nlock_timeout_seconds = 10\n\n[resilience]\ncall_timeout_ms = 1500"
    )
    .unwrap();

    let result = ConfigManager::load_from_sources(Some(file.path()), "SUMMARY_CACHE_IT_TIMEOUT", "test");
    assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
}

#[tokio::test]
async fn test_bootstrap_from_loaded_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[store]\nbackend = \"memory\"\n\n[telemetry]\nmetrics_enabled = false").unwrap();

    let manager =
        ConfigManager::load_from_sources(Some(file.path()), "SUMMARY_CACHE_IT_BOOT", "test").unwrap();
    let system = SummaryCacheSystem::from_manager(&manager).await.unwrap();

    assert_eq!(system.store.provider_name(), "memory");
    assert!(!system.store.is_distributed());
}
