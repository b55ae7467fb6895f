use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::enums::TimelineOrder;

/// Application-level constants
pub const APP_NAME: &str = "Careflow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DATABASE_FILE: &str = "careflow.db";
const SCHEDULER_CONFIG_FILE: &str = "scheduler.json";

/// Get the application data directory
/// ~/Careflow/ on all platforms
pub fn app_data_dir() -> Result<PathBuf, ProtocolError> {
    dirs::home_dir()
        .map(|home| home.join(APP_NAME))
        .ok_or_else(|| ProtocolError::Config("cannot determine home directory".into()))
}

/// Get the protocol database path
pub fn database_path() -> Result<PathBuf, ProtocolError> {
    Ok(app_data_dir()?.join(DATABASE_FILE))
}

/// Log filter used when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "careflow=debug,warn"
    } else {
        "careflow=info,warn"
    }
}

/// Scheduling defaults, read from `scheduler.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How far ahead a new instance is materialized.
    pub horizon_days: u32,
    pub timeline_order: TimelineOrder,
    pub include_completed_instances: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon_days: 180,
            timeline_order: TimelineOrder::Chronological,
            include_completed_instances: false,
        }
    }
}

impl SchedulerConfig {
    /// Loads `scheduler.json` from `dir`. A missing file gives the defaults;
    /// an unreadable or malformed one is an error.
    pub fn load(dir: &Path) -> Result<Self, ProtocolError> {
        let path = dir.join(SCHEDULER_CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No scheduler config, using defaults");
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(&path)
            .map_err(|e| ProtocolError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| ProtocolError::Config(format!("{SCHEDULER_CONFIG_FILE}: {e}")))?;

        if config.horizon_days == 0 {
            return Err(ProtocolError::Config("horizon_days must be at least 1".into()));
        }
        Ok(config)
    }

    /// Loads from the application data directory.
    pub fn load_default() -> Result<Self, ProtocolError> {
        Self::load(&app_data_dir()?)
    }
}
