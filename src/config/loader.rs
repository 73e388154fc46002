//! Configuration Loader
//!
//! Merges defaults, an optional TOML file and `TASKER_*` environment
//! variables into a validated [`SchedulerConfig`].

use super::error::{ConfigResult, ConfigurationError};
use super::SchedulerConfig;
use crate::constants::{queues::DEFAULT_KEY_PREFIX, system};
use ::config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Loaded, validated node configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: SchedulerConfig,
    environment: String,
}

impl ConfigManager {
    /// Load from defaults and the process environment
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_layers(None, None)
    }

    /// Load with a TOML file layered between defaults and the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_layers(Some(path.as_ref()), None)
    }

    /// Load with an explicit variable map standing in for the process environment
    pub fn load_with_env_source(
        path: Option<&Path>,
        env_source: HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_layers(path, Some(env_source))
    }

    /// Wrap an already-built configuration
    pub fn from_config(config: SchedulerConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            environment: config.environment.clone(),
            config,
        }))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn load_layers(
        path: Option<&Path>,
        env_source: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let environment = match &env_source {
            Some(vars) => Self::environment_from(|key| vars.get(key).cloned()),
            None => Self::detect_environment(),
        };

        let mut builder = Config::builder()
            .set_default("node_id", Uuid::new_v4().to_string())?
            .set_default("key_prefix", DEFAULT_KEY_PREFIX)?
            .set_default("workers", system::DEFAULT_WORKERS as i64)?
            .set_default("cycle_time_ms", system::DEFAULT_CYCLE_TIME_MS as i64)?;

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigurationError::config_file_not_found(path));
            }
            debug!(path = %path.display(), "Layering configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let env_layer = Environment::with_prefix(system::ENV_PREFIX)
            .try_parsing(true)
            .source(env_source);

        let config: SchedulerConfig = builder
            .add_source(env_layer)
            .set_override("environment", environment.clone())?
            .build()?
            .try_deserialize()?;

        config.validate()?;

        info!(
            node_id = %config.node_id,
            workers = config.workers,
            cycle_time_ms = config.cycle_time_ms,
            environment = %environment,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
        }))
    }

    /// Detect the deployment environment from the process
    pub fn detect_environment() -> String {
        Self::environment_from(|key| env::var(key).ok())
    }

    fn environment_from(lookup: impl Fn(&str) -> Option<String>) -> String {
        ["TASKER_ENV", "APP_ENV"]
            .iter()
            .find_map(|key| lookup(key))
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
    }
}
