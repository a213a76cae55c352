//! Application settings.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional `exporter.{toml,yaml,json}` file in the working directory, then
//! `EXPORTER_*` environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default location of the pipeline configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Base name of the optional settings file.
pub const SETTINGS_FILE: &str = "exporter";

/// Prefix of the settings environment variables.
pub const ENV_PREFIX: &str = "EXPORTER";

/// Main application configuration.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct AppConfig {
    /// File path or `http(s)` URL of the pipeline configuration document.
    pub config_path: String,
    /// How often the document is polled for changes. Zero loads it once.
    #[serde(with = "humantime_serde")]
    pub reload_interval: Duration,
    /// Log filter directive used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            reload_interval: Duration::ZERO,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the settings from the working directory and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_sources(
            File::with_name(SETTINGS_FILE).required(false),
            Environment::with_prefix(ENV_PREFIX),
        )
    }

    /// Layers `file` and then `env` over the defaults.
    pub fn from_sources<F, E>(file: F, env: E) -> Result<Self, config::ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
        E: config::Source + Send + Sync + 'static,
    {
        Config::builder()
            .set_default("config_path", DEFAULT_CONFIG_PATH)?
            .set_default("reload_interval", "0s")?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(vars))
    }

    #[test]
    fn test_defaults() {
        let config =
            AppConfig::from_sources(File::from_str("", FileFormat::Toml), env(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_file_settings() {
        let file = File::from_str(
            "config_path: https://example.com/config.yaml\nreload_interval: 1m\n",
            FileFormat::Yaml,
        );
        let config = AppConfig::from_sources(file, env(&[])).unwrap();
        assert_eq!(config.config_path, "https://example.com/config.yaml");
        assert_eq!(config.reload_interval, Duration::from_secs(60));
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = File::from_str("reload_interval = \"1m\"\nlog_level = \"warn\"\n", FileFormat::Toml);
        let config = AppConfig::from_sources(
            file,
            env(&[
                ("EXPORTER_RELOAD_INTERVAL", "5s"),
                ("EXPORTER_CONFIG_PATH", "/etc/exporter/pipelines.yaml"),
            ]),
        )
        .unwrap();
        assert_eq!(config.reload_interval, Duration::from_secs(5));
        assert_eq!(config.config_path, "/etc/exporter/pipelines.yaml");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_interval() {
        let file = File::from_str("reload_interval = \"soon\"\n", FileFormat::Toml);
        assert!(AppConfig::from_sources(file, env(&[])).is_err());
    }
}
