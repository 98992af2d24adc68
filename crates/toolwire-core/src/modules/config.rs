use std::fs;
use std::path::{Path, PathBuf};
use toolwire_types::{ConfigError, ResilienceConfig};
use tracing::{debug, info};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TOOLWIRE_CONFIG";

const CONFIG_DIR: &str = "toolwire";
const CONFIG_FILE: &str = "config.json";

/// `<config dir>/toolwire/config.json`, or a relative path when the platform
/// has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir().map_or_else(|| PathBuf::from(CONFIG_FILE), |d| d.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Pick the config path: explicit argument, then `TOOLWIRE_CONFIG`, then the
/// default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var(CONFIG_ENV) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => default_config_path(),
    }
}

/// Load and validate the configuration. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<ResilienceConfig, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(ResilienceConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound { path: path.display().to_string() },
        _ => ConfigError::ParseError { message: format!("Failed to read config: {e}") },
    })?;
    let config: ResilienceConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.check()?;

    info!(path = %path.display(), rate_limits = config.rate_limits.len(), "Configuration loaded");
    Ok(config)
}

/// Validate and write the configuration atomically.
pub fn save_config(path: &Path, config: &ResilienceConfig) -> Result<(), ConfigError> {
    config.check()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConfigError::from_io_error(&e))?;
    }

    let content = serde_json::to_string_pretty(config).map_err(|e| ConfigError::WriteError {
        message: format!("Failed to serialize config: {e}"),
    })?;

    // Atomic write
    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);
    fs::write(&temp_path, content).map_err(|e| ConfigError::from_io_error(&e))?;
    fs::rename(&temp_path, path).map_err(|e| ConfigError::from_io_error(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolwire_types::RateLimitRule;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ResilienceConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"breaker":{"failure_threshold":3},"rate_limits":[{"name":"sec","max_requests":10,"window_secs":1.0}]}"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.breaker.timeout_secs, 60);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.rate_limits.len(), 1);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"rate_limits":[{"name":"sec","max_requests":10,"window_secs":0}]}"#).unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = ResilienceConfig::default();
        config.deadline_secs = Some(45.0);
        config.rate_limits.push(RateLimitRule { name: "fred".to_string(), max_requests: 120, window_secs: 60.0 });

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
        assert!(!dir.path().join("nested").join("config.json.tmp").exists());
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = Path::new("/tmp/explicit.json");
        assert_eq!(resolve_config_path(Some(explicit)), explicit.to_path_buf());
    }
}
