//! Configuration management module
//!
//! User settings live in %APPDATA%\claude-notch-windows\settings.json and are written
//! atomically. The design configuration (tool categories, colors, animation patterns)
//! is embedded in the binary and can be overridden by a file next to the settings.

pub mod manager;
pub mod models;
pub mod notch_config;

pub use manager::SettingsManager;
pub use models::{SettingKey, Theme, UserSettings};
pub use notch_config::{AttentionConfig, DurationTier, NotchConfig, PatternConfig, PatternMode, ToolInfo};
