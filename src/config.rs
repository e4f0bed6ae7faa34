//! Queue configuration
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid config:
//!
//! ```toml
//! initial_batch_size = 3
//! max_iteration_time_ms = 40
//!
//! [side_effects]
//! lighting = false
//! neighbors = false
//! ```

use crate::constants::queue::{DEFAULT_INITIAL_BATCH_SIZE, DEFAULT_MAX_ITERATION_TIME_MS};
use crate::error::{QueueError, QueueResult};
use crate::queue::SideEffectSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Scheduling and write policy for a queue run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Chunks attempted per window regardless of elapsed time
    pub initial_batch_size: usize,
    /// Soft ceiling on a window's wall-clock time
    pub max_iteration_time_ms: u64,
    /// Side effects allowed on primary writes
    pub side_effects: SideEffectSet,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            initial_batch_size: DEFAULT_INITIAL_BATCH_SIZE,
            max_iteration_time_ms: DEFAULT_MAX_ITERATION_TIME_MS,
            side_effects: SideEffectSet::batch(),
        }
    }
}

impl QueueConfig {
    pub fn from_toml_str(source: &str) -> QueueResult<Self> {
        let config: QueueConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> QueueResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| QueueError::ConfigLoad {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let config: QueueConfig = toml::from_str(&source).map_err(|e| QueueError::ConfigLoad {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        config.validate()?;
        log::info!("[Config] Loaded queue config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.initial_batch_size == 0 {
            return Err(QueueError::InvalidConfig {
                field: "initial_batch_size".to_string(),
                value: "0".to_string(),
                reason: "at least one chunk must be attempted per window".to_string(),
            });
        }
        Ok(())
    }

    pub fn max_iteration_time(&self) -> Duration {
        Duration::from_millis(self.max_iteration_time_ms)
    }
}
