//! # Scheduler Configuration
//!
//! Per-node scheduler settings, layered by [`ConfigManager`]:
//!
//! 1. built-in defaults
//! 2. optional TOML file
//! 3. `TASKER_`-prefixed environment variables (`TASKER_NODE_ID`,
//!    `TASKER_WORKERS`, `TASKER_CYCLE_TIME_MS`, `TASKER_KEY_PREFIX`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasker_cluster::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let cycle = manager.config().cycle_time();
//! let workers = manager.config().workers;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{queues::DEFAULT_KEY_PREFIX, system};
use crate::messaging::QueueNames;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Settings for one scheduler node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Identity of this node; names its local queue and suffixes task ids
    pub node_id: String,

    /// Namespace for every store key
    pub key_prefix: String,

    /// Number of polling processors on this node
    pub workers: usize,

    /// Delay between processor cycles
    pub cycle_time_ms: u64,

    /// Deployment environment, informational
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            node_id: Uuid::new_v4().to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            workers: system::DEFAULT_WORKERS,
            cycle_time_ms: system::DEFAULT_CYCLE_TIME_MS,
            environment: default_environment(),
        }
    }
}

impl SchedulerConfig {
    /// Defaults with a fixed node id
    pub fn for_node(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cycle_time_ms(mut self, cycle_time_ms: u64) -> Self {
        self.cycle_time_ms = cycle_time_ms;
        self
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(self.cycle_time_ms)
    }

    /// Store keys for this node
    pub fn queue_names(&self) -> QueueNames {
        QueueNames::new(&self.key_prefix, &self.node_id)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.node_id.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "node_id",
                "scheduler configuration",
            ));
        }

        if QueueNames::is_reserved_node_id(&self.node_id) {
            return Err(ConfigurationError::invalid_value(
                "node_id",
                &self.node_id,
                "collides with a shared queue key",
            ));
        }

        if self.key_prefix.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "key_prefix",
                "scheduler configuration",
            ));
        }

        if self.workers == 0 {
            return Err(ConfigurationError::invalid_value(
                "workers",
                "0",
                "must be greater than 0",
            ));
        }

        if self.cycle_time_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "cycle_time_ms",
                "0",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}
