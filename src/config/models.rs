//! User settings data model
//!
//! Defines the user-editable preferences stored in settings.json, separate from the
//! design configuration in `notch-config.json`. Every key is validated on its own so
//! a single bad value never discards the rest of the file.

use crate::error::{NotchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Keys accepted in settings.json
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    /// Seconds without hook events before the app counts as idle
    IdleTimeout,
    /// Seconds without events before a session is considered stale
    ActivityTimeout,
    /// Port of the local hook listener
    ServerPort,
    /// Register the app in the Windows Run key
    LaunchOnStartup,
    /// Tray icon backdrop alpha
    BackgroundOpacity,
    /// Hide the activity surface while idle
    AutoHide,
    /// Draw the category initial on the tray icon
    ShowCategoryLetter,
    /// Animation speed factor
    AnimationSpeedMultiplier,
    /// Animate the activity grid
    AnimationsEnabled,
    /// Play system sounds for errors, attention and session end
    SoundsEnabled,
    /// Flash the tray icon red on tool errors
    ErrorFlashEnabled,
    /// Show desktop toasts
    ToastsEnabled,
    /// Remember terminal windows so they can be focused from the tray
    ClickToFocus,
    /// Global hotkey that focuses the current session's terminal
    GlobalHotkey,
    /// Compact one-line session cards
    MiniMode,
    /// Per-project color overrides (project name to color name)
    ProjectColors,
    /// Dark or light theme
    Theme,
    /// Discord, Slack or generic webhook URL
    WebhookUrl,
    /// Send events to the webhook
    WebhookEnabled,
}

impl SettingKey {
    /// Every setting key in settings.json order
    pub const ALL: [SettingKey; 19] = [
        SettingKey::IdleTimeout,
        SettingKey::ActivityTimeout,
        SettingKey::ServerPort,
        SettingKey::LaunchOnStartup,
        SettingKey::BackgroundOpacity,
        SettingKey::AutoHide,
        SettingKey::ShowCategoryLetter,
        SettingKey::AnimationSpeedMultiplier,
        SettingKey::AnimationsEnabled,
        SettingKey::SoundsEnabled,
        SettingKey::ErrorFlashEnabled,
        SettingKey::ToastsEnabled,
        SettingKey::ClickToFocus,
        SettingKey::GlobalHotkey,
        SettingKey::MiniMode,
        SettingKey::ProjectColors,
        SettingKey::Theme,
        SettingKey::WebhookUrl,
        SettingKey::WebhookEnabled,
    ];

    /// Name of the key in settings.json
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::IdleTimeout => "idle_timeout",
            SettingKey::ActivityTimeout => "activity_timeout",
            SettingKey::ServerPort => "server_port",
            SettingKey::LaunchOnStartup => "launch_on_startup",
            SettingKey::BackgroundOpacity => "background_opacity",
            SettingKey::AutoHide => "auto_hide",
            SettingKey::ShowCategoryLetter => "show_category_letter",
            SettingKey::AnimationSpeedMultiplier => "animation_speed_multiplier",
            SettingKey::AnimationsEnabled => "animations_enabled",
            SettingKey::SoundsEnabled => "sounds_enabled",
            SettingKey::ErrorFlashEnabled => "error_flash_enabled",
            SettingKey::ToastsEnabled => "toasts_enabled",
            SettingKey::ClickToFocus => "click_to_focus",
            SettingKey::GlobalHotkey => "global_hotkey",
            SettingKey::MiniMode => "mini_mode",
            SettingKey::ProjectColors => "project_colors",
            SettingKey::Theme => "theme",
            SettingKey::WebhookUrl => "webhook_url",
            SettingKey::WebhookEnabled => "webhook_enabled",
        }
    }

    /// Look up a key by its settings.json name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tray icon theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark backdrop, white letter
    #[default]
    Dark,
    /// Light backdrop, dark letter
    Light,
}

/// User preferences persisted in settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Seconds without hook events before the app is idle (5-120)
    pub idle_timeout: u64,
    /// Seconds without events before a session is stale (10-300)
    pub activity_timeout: u64,
    /// Local listener port (1024-65535)
    pub server_port: u16,
    /// Launch with Windows
    pub launch_on_startup: bool,
    /// Tray icon backdrop alpha (0-255)
    pub background_opacity: u8,
    /// Hide while idle
    pub auto_hide: bool,
    /// Draw the category initial
    pub show_category_letter: bool,
    /// Animation speed (0.25-3.0)
    pub animation_speed_multiplier: f64,
    /// Animate the activity grid
    pub animations_enabled: bool,
    /// System sounds
    pub sounds_enabled: bool,
    /// Red flash on errors
    pub error_flash_enabled: bool,
    /// Desktop toasts
    pub toasts_enabled: bool,
    /// Capture terminal windows for focusing
    pub click_to_focus: bool,
    /// Global hotkey, empty when disabled
    pub global_hotkey: String,
    /// Compact session cards
    pub mini_mode: bool,
    /// Project name to color name overrides
    pub project_colors: BTreeMap<String, String>,
    /// Tray icon theme
    pub theme: Theme,
    /// Webhook URL, empty or https
    pub webhook_url: String,
    /// Deliver events to the webhook
    pub webhook_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            idle_timeout: 15,
            activity_timeout: 60,
            server_port: 27182,
            launch_on_startup: false,
            background_opacity: 220,
            auto_hide: true,
            show_category_letter: true,
            animation_speed_multiplier: 1.0,
            animations_enabled: true,
            sounds_enabled: true,
            error_flash_enabled: true,
            toasts_enabled: true,
            click_to_focus: false,
            global_hotkey: "ctrl+shift+n".to_string(),
            mini_mode: false,
            project_colors: BTreeMap::new(),
            theme: Theme::Dark,
            webhook_url: String::new(),
            webhook_enabled: false,
        }
    }
}

impl UserSettings {
    /// Build settings from parsed settings.json content
    ///
    /// Each known key is validated independently; missing or invalid values keep their
    /// default. Anything other than a JSON object yields the full default set.
    pub fn from_json_value(value: &Value) -> Self {
        let mut settings = Self::default();

        let Some(map) = value.as_object() else {
            warn!("Settings file is not a JSON object, using defaults");
            return settings;
        };

        for key in SettingKey::ALL {
            if let Some(raw) = map.get(key.as_str())
                && let Err(e) = settings.apply(key, raw)
            {
                warn!("{e}; using default {}", Self::default().get(key));
            }
        }

        settings
    }

    /// Serialize to the settings.json representation
    pub fn to_json_value(&self) -> Value {
        json!({
            "idle_timeout": self.idle_timeout,
            "activity_timeout": self.activity_timeout,
            "server_port": self.server_port,
            "launch_on_startup": self.launch_on_startup,
            "background_opacity": self.background_opacity,
            "auto_hide": self.auto_hide,
            "show_category_letter": self.show_category_letter,
            "animation_speed_multiplier": self.animation_speed_multiplier,
            "animations_enabled": self.animations_enabled,
            "sounds_enabled": self.sounds_enabled,
            "error_flash_enabled": self.error_flash_enabled,
            "toasts_enabled": self.toasts_enabled,
            "click_to_focus": self.click_to_focus,
            "global_hotkey": self.global_hotkey,
            "mini_mode": self.mini_mode,
            "project_colors": self.project_colors,
            "theme": self.theme,
            "webhook_url": self.webhook_url,
            "webhook_enabled": self.webhook_enabled,
        })
    }

    /// Current value of a setting as JSON
    pub fn get(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::IdleTimeout => json!(self.idle_timeout),
            SettingKey::ActivityTimeout => json!(self.activity_timeout),
            SettingKey::ServerPort => json!(self.server_port),
            SettingKey::LaunchOnStartup => json!(self.launch_on_startup),
            SettingKey::BackgroundOpacity => json!(self.background_opacity),
            SettingKey::AutoHide => json!(self.auto_hide),
            SettingKey::ShowCategoryLetter => json!(self.show_category_letter),
            SettingKey::AnimationSpeedMultiplier => json!(self.animation_speed_multiplier),
            SettingKey::AnimationsEnabled => json!(self.animations_enabled),
            SettingKey::SoundsEnabled => json!(self.sounds_enabled),
            SettingKey::ErrorFlashEnabled => json!(self.error_flash_enabled),
            SettingKey::ToastsEnabled => json!(self.toasts_enabled),
            SettingKey::ClickToFocus => json!(self.click_to_focus),
            SettingKey::GlobalHotkey => json!(self.global_hotkey),
            SettingKey::MiniMode => json!(self.mini_mode),
            SettingKey::ProjectColors => json!(self.project_colors),
            SettingKey::Theme => json!(self.theme),
            SettingKey::WebhookUrl => json!(self.webhook_url),
            SettingKey::WebhookEnabled => json!(self.webhook_enabled),
        }
    }

    /// Validate and store a value
    ///
    /// Returns `Ok(true)` when the stored value changed, `Ok(false)` when it was already
    /// equal. Integers are never accepted from booleans or floats.
    pub fn apply(&mut self, key: SettingKey, value: &Value) -> Result<bool> {
        let invalid = |reason: &str| NotchError::InvalidSetting {
            key: key.as_str().to_string(),
            reason: reason.to_string(),
        };

        let changed = match key {
            SettingKey::IdleTimeout => {
                let v = uint_in_range(value, 5, 120)
                    .ok_or_else(|| invalid("expected an integer between 5 and 120"))?;
                replace(&mut self.idle_timeout, v)
            }
            SettingKey::ActivityTimeout => {
                let v = uint_in_range(value, 10, 300)
                    .ok_or_else(|| invalid("expected an integer between 10 and 300"))?;
                replace(&mut self.activity_timeout, v)
            }
            SettingKey::ServerPort => {
                let v = uint_in_range(value, 1024, 65535)
                    .and_then(|v| u16::try_from(v).ok())
                    .ok_or_else(|| invalid("expected an integer between 1024 and 65535"))?;
                replace(&mut self.server_port, v)
            }
            SettingKey::BackgroundOpacity => {
                let v = uint_in_range(value, 0, 255)
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| invalid("expected an integer between 0 and 255"))?;
                replace(&mut self.background_opacity, v)
            }
            SettingKey::AnimationSpeedMultiplier => {
                let v = value
                    .as_f64()
                    .filter(|v| (0.25..=3.0).contains(v))
                    .ok_or_else(|| invalid("expected a number between 0.25 and 3.0"))?;
                replace(&mut self.animation_speed_multiplier, v)
            }
            SettingKey::Theme => {
                let v = serde_json::from_value::<Theme>(value.clone())
                    .map_err(|_| invalid("expected dark or light"))?;
                replace(&mut self.theme, v)
            }
            SettingKey::GlobalHotkey => {
                let v = value
                    .as_str()
                    .filter(|s| crate::utils::hotkey::validate_hotkey_string(s))
                    .ok_or_else(|| invalid("expected a hotkey such as ctrl+shift+n, or empty"))?;
                replace(&mut self.global_hotkey, v.to_string())
            }
            SettingKey::WebhookUrl => {
                let v = value
                    .as_str()
                    .filter(|s| s.is_empty() || s.starts_with("https://"))
                    .ok_or_else(|| invalid("expected an https:// URL, or empty"))?;
                replace(&mut self.webhook_url, v.to_string())
            }
            SettingKey::ProjectColors => {
                let map = value
                    .as_object()
                    .ok_or_else(|| invalid("expected an object of project name to color"))?;
                let mut colors = BTreeMap::new();
                for (project, color) in map {
                    let color = color
                        .as_str()
                        .ok_or_else(|| invalid("color names must be strings"))?;
                    colors.insert(project.clone(), color.to_string());
                }
                replace(&mut self.project_colors, colors)
            }
            SettingKey::LaunchOnStartup
            | SettingKey::AutoHide
            | SettingKey::ShowCategoryLetter
            | SettingKey::AnimationsEnabled
            | SettingKey::SoundsEnabled
            | SettingKey::ErrorFlashEnabled
            | SettingKey::ToastsEnabled
            | SettingKey::ClickToFocus
            | SettingKey::MiniMode
            | SettingKey::WebhookEnabled => {
                let v = value.as_bool().ok_or_else(|| invalid("expected true or false"))?;
                let slot = self
                    .bool_slot(key)
                    .ok_or_else(|| invalid("not a boolean setting"))?;
                replace(slot, v)
            }
        };

        Ok(changed)
    }

    fn bool_slot(&mut self, key: SettingKey) -> Option<&mut bool> {
        let slot = match key {
            SettingKey::LaunchOnStartup => &mut self.launch_on_startup,
            SettingKey::AutoHide => &mut self.auto_hide,
            SettingKey::ShowCategoryLetter => &mut self.show_category_letter,
            SettingKey::AnimationsEnabled => &mut self.animations_enabled,
            SettingKey::SoundsEnabled => &mut self.sounds_enabled,
            SettingKey::ErrorFlashEnabled => &mut self.error_flash_enabled,
            SettingKey::ToastsEnabled => &mut self.toasts_enabled,
            SettingKey::ClickToFocus => &mut self.click_to_focus,
            SettingKey::MiniMode => &mut self.mini_mode,
            SettingKey::WebhookEnabled => &mut self.webhook_enabled,
            _ => return None,
        };
        Some(slot)
    }
}

/// Store `value` in `slot`, reporting whether it differed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Non-negative JSON integer within `lo..=hi` (rejects floats and booleans)
fn uint_in_range(value: &Value, lo: u64, hi: u64) -> Option<u64> {
    value.as_u64().filter(|v| (lo..=hi).contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let settings = UserSettings::default();
        assert_eq!(settings.idle_timeout, 15);
        assert_eq!(settings.activity_timeout, 60);
        assert_eq!(settings.server_port, 27182);
        assert_eq!(settings.global_hotkey, "ctrl+shift+n");
        assert_eq!(settings.theme, Theme::Dark);
        assert!(settings.toasts_enabled);
        assert!(!settings.mini_mode);
        assert!(settings.project_colors.is_empty());
    }

    #[test]
    fn test_key_names_round_trip() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::from_name(key.as_str()), Some(key));
        }
        assert_eq!(SettingKey::from_name("nonexistent_key"), None);
    }

    #[test]
    fn test_each_bool_setting_has_its_own_slot() {
        let defaults = UserSettings::default();
        let mut bool_keys = 0;
        for key in SettingKey::ALL {
            let Some(current) = defaults.get(key).as_bool() else {
                let mut settings = defaults.clone();
                assert!(settings.bool_slot(key).is_none(), "{}", key.as_str());
                continue;
            };
            bool_keys += 1;

            let mut settings = defaults.clone();
            assert!(settings.apply(key, &Value::Bool(!current)).unwrap());
            for other in SettingKey::ALL {
                let expected = if other == key { Value::Bool(!current) } else { defaults.get(other) };
                assert_eq!(settings.get(other), expected, "{} changed {}", key.as_str(), other.as_str());
            }
        }
        assert_eq!(bool_keys, 10);
    }

    #[test]
    fn test_apply_reports_change() {
        let mut settings = UserSettings::default();
        assert!(settings.apply(SettingKey::IdleTimeout, &json!(30)).unwrap());
        assert!(!settings.apply(SettingKey::IdleTimeout, &json!(30)).unwrap());
        assert_eq!(settings.idle_timeout, 30);
    }

    #[test]
    fn test_apply_rejects_out_of_range() {
        let mut settings = UserSettings::default();
        assert!(settings.apply(SettingKey::IdleTimeout, &json!(4)).is_err());
        assert!(settings.apply(SettingKey::IdleTimeout, &json!(121)).is_err());
        assert!(settings.apply(SettingKey::ServerPort, &json!(80)).is_err());
        assert!(settings.apply(SettingKey::BackgroundOpacity, &json!(256)).is_err());
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn test_apply_rejects_bool_as_int() {
        let mut settings = UserSettings::default();
        let result = settings.apply(SettingKey::IdleTimeout, &json!(true));
        assert!(matches!(result, Err(NotchError::InvalidSetting { .. })));
    }

    #[test]
    fn test_apply_rejects_float_for_int_setting() {
        let mut settings = UserSettings::default();
        assert!(settings.apply(SettingKey::IdleTimeout, &json!(20.5)).is_err());
    }

    #[test]
    fn test_speed_multiplier_accepts_int_and_float() {
        let mut settings = UserSettings::default();
        assert!(settings.apply(SettingKey::AnimationSpeedMultiplier, &json!(2)).unwrap());
        assert!((settings.animation_speed_multiplier - 2.0).abs() < f64::EPSILON);
        assert!(settings.apply(SettingKey::AnimationSpeedMultiplier, &json!(0.25)).unwrap());
        assert!(settings.apply(SettingKey::AnimationSpeedMultiplier, &json!(3.5)).is_err());
        assert!(settings.apply(SettingKey::AnimationSpeedMultiplier, &json!(false)).is_err());
    }

    #[test]
    fn test_theme_validation() {
        let mut settings = UserSettings::default();
        assert!(settings.apply(SettingKey::Theme, &json!("light")).unwrap());
        assert_eq!(settings.theme, Theme::Light);
        assert!(settings.apply(SettingKey::Theme, &json!("solarized")).is_err());
    }

    #[test]
    fn test_webhook_url_requires_https() {
        let mut settings = UserSettings::default();
        assert!(
            settings
                .apply(SettingKey::WebhookUrl, &json!("http://example.com/hook"))
                .is_err()
        );
        assert!(
            settings
                .apply(SettingKey::WebhookUrl, &json!("https://example.com/hook"))
                .unwrap()
        );
        assert!(settings.apply(SettingKey::WebhookUrl, &json!("")).unwrap());
    }

    #[test]
    fn test_global_hotkey_validation() {
        let mut settings = UserSettings::default();
        assert!(settings.apply(SettingKey::GlobalHotkey, &json!("alt+f1")).unwrap());
        assert!(settings.apply(SettingKey::GlobalHotkey, &json!("")).unwrap());
        assert!(settings.apply(SettingKey::GlobalHotkey, &json!("n")).is_err());
        assert!(settings.apply(SettingKey::GlobalHotkey, &json!("ctrl+f25")).is_err());
    }

    #[test]
    fn test_project_colors_validation() {
        let mut settings = UserSettings::default();
        let colors = json!({"my-app": "purple", "api": "cyan"});
        assert!(settings.apply(SettingKey::ProjectColors, &colors).unwrap());
        assert_eq!(settings.get(SettingKey::ProjectColors), colors);

        assert!(settings.apply(SettingKey::ProjectColors, &json!("purple")).is_err());
        assert!(settings.apply(SettingKey::ProjectColors, &json!({"x": 1})).is_err());
        assert!(settings.apply(SettingKey::ProjectColors, &json!(["purple"])).is_err());
        assert_eq!(settings.get(SettingKey::ProjectColors), colors);
    }

    #[test]
    fn test_from_json_value_per_key_fallback() {
        let raw = json!({
            "idle_timeout": 20,
            "activity_timeout": 5,
            "animation_speed_multiplier": 1.5,
            "theme": "solarized",
            "unknown_key": 42,
        });
        let settings = UserSettings::from_json_value(&raw);
        assert_eq!(settings.idle_timeout, 20);
        assert_eq!(settings.activity_timeout, 60);
        assert!((settings.animation_speed_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(settings.theme, Theme::Dark);
        // Keys absent from older files pick up their defaults
        assert!(settings.sounds_enabled);
        assert!(settings.error_flash_enabled);
        assert_eq!(settings.background_opacity, 220);
    }

    #[test]
    fn test_from_json_value_non_object() {
        let settings = UserSettings::from_json_value(&json!([1, 2, 3]));
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn test_json_round_trip() {
        let mut settings = UserSettings::default();
        settings.apply(SettingKey::MiniMode, &json!(true)).unwrap();
        settings
            .apply(SettingKey::ProjectColors, &json!({"notch": "green"}))
            .unwrap();
        settings.apply(SettingKey::Theme, &json!("light")).unwrap();

        let restored = UserSettings::from_json_value(&settings.to_json_value());
        assert_eq!(restored, settings);
    }

    #[test]
    fn test_get_matches_to_json_value() {
        let settings = UserSettings::default();
        let full = settings.to_json_value();
        for key in SettingKey::ALL {
            assert_eq!(full[key.as_str()], settings.get(key), "mismatch for {key}");
        }
    }

    proptest! {
        #[test]
        fn prop_idle_timeout_accepts_exactly_its_range(value in 0u64..500) {
            let mut settings = UserSettings::default();
            let accepted = settings.apply(SettingKey::IdleTimeout, &json!(value)).is_ok();
            prop_assert_eq!(accepted, (5..=120).contains(&value));
        }

        #[test]
        fn prop_apply_never_panics_on_strings(key_index in 0usize..19, text in ".*") {
            let mut settings = UserSettings::default();
            let _ = settings.apply(SettingKey::ALL[key_index], &json!(text));
        }
    }
}
