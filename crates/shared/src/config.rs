//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Engine limits and defaults.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine limits and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum hierarchy depth expanded by the resolver.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Maximum number of wavefront passes per allocation run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Depth bound for rule dependency closure.
    #[serde(default = "default_cycle_guard_depth")]
    pub cycle_guard_depth: u32,
    /// How long to wait for the run lock, in seconds.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_iterations: default_max_iterations(),
            cycle_guard_depth: default_cycle_guard_depth(),
            lock_timeout_secs: default_lock_timeout(),
        }
    }
}

fn default_max_depth() -> u32 {
    10
}

fn default_max_iterations() -> u32 {
    100
}

fn default_cycle_guard_depth() -> u32 {
    10
}

fn default_lock_timeout() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON-formatted log lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "stratum=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STRATUM").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars_unset(
            ["STRATUM__ENGINE__MAX_DEPTH", "STRATUM__LOGGING__JSON"],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.engine.max_depth, 10);
                assert_eq!(config.engine.max_iterations, 100);
                assert_eq!(config.engine.cycle_guard_depth, 10);
                assert_eq!(config.engine.lock_timeout_secs, 30);
                assert_eq!(config.logging.filter, "stratum=info");
                assert!(!config.logging.json);
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("STRATUM__ENGINE__MAX_ITERATIONS", Some("7")),
                ("STRATUM__LOGGING__JSON", Some("true")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.engine.max_iterations, 7);
                assert_eq!(config.engine.max_depth, 10);
                assert!(config.logging.json);
            },
        );
    }
}
