//! Persistent tool usage statistics
//!
//! Counts are kept in %APPDATA%\claude-notch-windows\session_stats.json and reset
//! after 90 days without updates.

use crate::config::SettingsManager;
use crate::config::manager::write_atomic;
use crate::error::{NotchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current on-disk schema
pub const SCHEMA_VERSION: u32 = 1;

/// Age after which stored statistics are discarded
pub const PRUNE_AFTER_DAYS: f64 = 90.0;

/// Stored statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsData {
    /// Schema version of the file
    pub schema_version: u32,
    /// Uses per tool name
    #[serde(default)]
    pub tool_counts: BTreeMap<String, u64>,
    /// Seconds spent per category
    #[serde(default)]
    pub category_seconds: BTreeMap<String, f64>,
    /// Sessions that ended
    #[serde(default)]
    pub session_count: u64,
    /// Tool uses across all tools
    #[serde(default)]
    pub total_tool_uses: u64,
    /// Unix time of the first record
    #[serde(default)]
    pub first_recorded: Option<f64>,
    /// Unix time of the last update
    #[serde(default)]
    pub last_updated: Option<f64>,
}

impl Default for StatsData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            tool_counts: BTreeMap::new(),
            category_seconds: BTreeMap::new(),
            session_count: 0,
            total_tool_uses: 0,
            first_recorded: None,
            last_updated: None,
        }
    }
}

/// Tool usage statistics with best-effort persistence
#[derive(Debug)]
pub struct SessionStats {
    path: Option<PathBuf>,
    data: StatsData,
}

impl SessionStats {
    /// Get the path to the stats file
    pub fn get_stats_path() -> PathBuf {
        SettingsManager::get_settings_dir().join("session_stats.json")
    }

    /// Load from the default location
    pub fn load() -> Self {
        Self::load_from(Self::get_stats_path())
    }

    /// Load from `path`; missing, corrupt or outdated files start empty
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        use tracing::{error, info, warn};

        let path = path.into();
        let mut stats = Self {
            path: Some(path.clone()),
            data: StatsData::default(),
        };

        if !path.exists() {
            return stats;
        }

        let loaded = std::fs::read_to_string(&path)
            .map_err(NotchError::from)
            .and_then(|json| serde_json::from_str::<serde_json::Value>(&json).map_err(NotchError::from));

        match loaded {
            Ok(value) => {
                if value.get("schema_version").and_then(serde_json::Value::as_u64)
                    != Some(u64::from(SCHEMA_VERSION))
                {
                    warn!("session_stats.json schema mismatch, resetting");
                    return stats;
                }
                match serde_json::from_value::<StatsData>(value) {
                    Ok(data) => stats.data = data,
                    Err(e) => {
                        error!("Failed to load session stats: {}", e);
                        return stats;
                    }
                }
            }
            Err(e) => {
                error!("Failed to load session stats: {}", e);
                return stats;
            }
        }

        if let Some(last_updated) = stats.data.last_updated {
            let age_days = (unix_now() - last_updated) / 86_400.0;
            if age_days > PRUNE_AFTER_DAYS {
                info!("Session stats older than {PRUNE_AFTER_DAYS} days, resetting");
                stats.data = StatsData::default();
                stats.save_logged();
            }
        }

        stats
    }

    /// Statistics that are never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: StatsData::default(),
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Count one finished tool call and its duration
    pub fn record_tool_use(&mut self, tool_name: &str, category: &str, duration_seconds: f64) {
        *self.data.tool_counts.entry(tool_name.to_string()).or_insert(0) += 1;
        *self
            .data
            .category_seconds
            .entry(category.to_string())
            .or_insert(0.0) += duration_seconds.max(0.0);
        self.data.total_tool_uses += 1;
        self.touch();
        self.save_logged();
    }

    /// Count one ended session
    pub fn increment_session_count(&mut self) {
        self.data.session_count += 1;
        self.touch();
        self.save_logged();
    }

    /// Current statistics
    pub fn get_stats(&self) -> &StatsData {
        &self.data
    }

    /// Write the statistics atomically
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.data)?;
        write_atomic(path, json.as_bytes()).map_err(|e| NotchError::StatsError(Box::new(e)))
    }

    fn save_logged(&self) {
        use tracing::error;

        if let Err(e) = self.save() {
            error!("Failed to save session stats: {}", e);
        }
    }

    fn touch(&mut self) {
        let now = unix_now();
        self.data.last_updated = Some(now);
        self.data.first_recorded.get_or_insert(now);
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}
