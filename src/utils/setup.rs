//! Claude Code hook installation
//!
//! Registers `notch-hook` as a command hook for every lifecycle event in
//! `~/.claude/settings.json`, leaving other hooks and settings untouched.

use crate::config::manager::write_atomic;
use crate::error::{NotchError, Result, StringError};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

/// Lifecycle events the hook is registered for
pub const HOOK_EVENTS: [&str; 8] = [
    "PreToolUse",
    "PostToolUse",
    "Stop",
    "SubagentStop",
    "SessionStart",
    "SessionEnd",
    "UserPromptSubmit",
    "Notification",
];

const PIN_COMMAND: &str = "send-to-notch";
const UNPIN_COMMAND: &str = "remove-from-notch";

/// Edits the Claude Code settings file
#[derive(Debug, Clone)]
pub struct HookInstaller {
    settings_path: PathBuf,
    hook_command: String,
}

impl HookInstaller {
    /// Installer for an explicit settings file and hook command
    pub fn new(settings_path: impl Into<PathBuf>, hook_command: impl Into<String>) -> Self {
        Self {
            settings_path: settings_path.into(),
            hook_command: hook_command.into(),
        }
    }

    /// Installer for `~/.claude/settings.json`, using the `notch-hook` next to this executable
    pub fn for_current_user() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            NotchError::HookInstallError(StringError::new("Could not determine home directory"))
        })?;
        let hook_exe = std::env::current_exe()?
            .with_file_name(format!("notch-hook{}", std::env::consts::EXE_SUFFIX));
        let command = format!("\"{}\"", hook_exe.display()).replace('\\', "/");

        Ok(Self::new(home.join(".claude").join("settings.json"), command))
    }

    /// Settings file being edited
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Command registered for each event
    pub fn hook_command(&self) -> &str {
        &self.hook_command
    }

    /// Register the hook for every event where it is missing
    ///
    /// Returns the number of events that gained an entry.
    pub fn install(&self) -> Result<usize> {
        use tracing::info;

        let mut settings = self.read_settings()?;
        let root = as_object(&mut settings)?;

        let hooks = object_entry(root, "hooks")?;
        let mut added = 0;
        for event in HOOK_EVENTS {
            let entries = hooks
                .entry(event)
                .or_insert_with(|| Value::Array(Vec::new()));
            let Value::Array(entries) = entries else {
                return Err(invalid(&format!("hooks.{event} is not an array")));
            };

            if entries.iter().any(|entry| self.mentions_hook(entry)) {
                continue;
            }
            entries.push(json!({
                "matcher": "",
                "hooks": [{"type": "command", "command": self.hook_command}],
            }));
            added += 1;
        }

        let commands = object_entry(root, "commands")?;
        commands.insert(
            PIN_COMMAND.to_string(),
            json!({
                "description": "Pin current session to the Claude Notch display",
                "script": format!("{} pin", self.hook_command),
            }),
        );
        commands.insert(
            UNPIN_COMMAND.to_string(),
            json!({
                "description": "Unpin all sessions from the Claude Notch display",
                "script": format!("{} unpin", self.hook_command),
            }),
        );

        self.write_settings(&settings)?;
        info!("Installed hooks for {} events in {}", added, self.settings_path.display());
        Ok(added)
    }

    /// Remove our entries, dropping event lists that end up empty
    ///
    /// Returns the number of entries removed.
    pub fn uninstall(&self) -> Result<usize> {
        use tracing::info;

        if !self.settings_path.exists() {
            return Ok(0);
        }

        let mut settings = self.read_settings()?;
        let root = as_object(&mut settings)?;

        let mut removed = 0;
        if let Some(Value::Object(hooks)) = root.get_mut("hooks") {
            for entries in hooks.values_mut() {
                if let Value::Array(entries) = entries {
                    let before = entries.len();
                    entries.retain(|entry| !self.mentions_hook(entry));
                    removed += before - entries.len();
                }
            }
            hooks.retain(|_, entries| !matches!(entries, Value::Array(a) if a.is_empty()));
        }

        if let Some(Value::Object(commands)) = root.get_mut("commands") {
            commands.remove(PIN_COMMAND);
            commands.remove(UNPIN_COMMAND);
        }

        self.write_settings(&settings)?;
        info!("Removed {} hook entries from {}", removed, self.settings_path.display());
        Ok(removed)
    }

    /// Whether any event lists our hook
    pub fn is_installed(&self) -> bool {
        let Ok(settings) = self.read_settings() else {
            return false;
        };
        settings
            .get("hooks")
            .and_then(Value::as_object)
            .is_some_and(|hooks| {
                hooks.values().filter_map(Value::as_array).any(|entries| {
                    entries.iter().any(|entry| self.mentions_hook(entry))
                })
            })
    }

    fn mentions_hook(&self, entry: &Value) -> bool {
        match entry {
            Value::String(s) => s.contains(&self.hook_command),
            Value::Array(items) => items.iter().any(|v| self.mentions_hook(v)),
            Value::Object(map) => map.values().any(|v| self.mentions_hook(v)),
            _ => false,
        }
    }

    fn read_settings(&self) -> Result<Value> {
        if !self.settings_path.exists() {
            return Ok(Value::Object(Map::new()));
        }
        let text = std::fs::read_to_string(&self.settings_path)
            .map_err(|e| NotchError::HookInstallError(Box::new(e)))?;
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&text).map_err(|e| NotchError::HookInstallError(Box::new(e)))
    }

    fn write_settings(&self, settings: &Value) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        write_atomic(&self.settings_path, json.as_bytes())
            .map_err(|e| NotchError::HookInstallError(Box::new(e)))
    }
}

fn invalid(reason: &str) -> NotchError {
    NotchError::HookInstallError(StringError::new(reason))
}

fn as_object(value: &mut Value) -> Result<&mut Map<String, Value>> {
    value
        .as_object_mut()
        .ok_or_else(|| invalid("settings.json is not a JSON object"))
}

fn object_entry<'a>(root: &'a mut Map<String, Value>, key: &str) -> Result<&'a mut Map<String, Value>> {
    root.entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| invalid(&format!("'{key}' is not an object")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dir;

    const HOOK: &str = "\"C:/Tools/notch-hook.exe\"";

    fn read(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_install_creates_settings() {
        let dir = create_test_dir();
        let path = dir.path().join(".claude").join("settings.json");
        let installer = HookInstaller::new(&path, HOOK);

        assert!(!installer.is_installed());
        assert_eq!(installer.install().unwrap(), HOOK_EVENTS.len());
        assert!(installer.is_installed());

        let settings = read(&path);
        for event in HOOK_EVENTS {
            let entry = &settings["hooks"][event][0];
            assert_eq!(entry["matcher"], "");
            assert_eq!(entry["hooks"][0]["type"], "command");
            assert_eq!(entry["hooks"][0]["command"], HOOK);
        }
        assert_eq!(settings["commands"]["send-to-notch"]["script"], format!("{HOOK} pin"));
    }

    #[test]
    fn test_install_is_idempotent() {
        let dir = create_test_dir();
        let path = dir.path().join("settings.json");
        let installer = HookInstaller::new(&path, HOOK);

        installer.install().unwrap();
        assert_eq!(installer.install().unwrap(), 0);
        assert_eq!(read(&path)["hooks"]["Stop"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_install_preserves_other_settings() {
        let dir = create_test_dir();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"model": "opus", "hooks": {"Stop": [{"matcher": "", "hooks": [{"type": "command", "command": "other"}]}]}}"#,
        )
        .unwrap();

        HookInstaller::new(&path, HOOK).install().unwrap();

        let settings = read(&path);
        assert_eq!(settings["model"], "opus");
        let stop = settings["hooks"]["Stop"].as_array().unwrap();
        assert_eq!(stop.len(), 2);
        assert_eq!(stop[0]["hooks"][0]["command"], "other");
    }

    #[test]
    fn test_uninstall_removes_only_our_entries() {
        let dir = create_test_dir();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"hooks": {"Stop": [{"matcher": "", "hooks": [{"type": "command", "command": "other"}]}]}}"#,
        )
        .unwrap();
        let installer = HookInstaller::new(&path, HOOK);
        installer.install().unwrap();

        assert_eq!(installer.uninstall().unwrap(), HOOK_EVENTS.len());
        assert!(!installer.is_installed());

        let settings = read(&path);
        assert_eq!(settings["hooks"]["Stop"].as_array().unwrap().len(), 1);
        assert!(settings["hooks"].get("PreToolUse").is_none());
        assert!(settings["commands"].get("send-to-notch").is_none());
    }

    #[test]
    fn test_uninstall_without_settings() {
        let dir = create_test_dir();
        let installer = HookInstaller::new(dir.path().join("missing.json"), HOOK);
        assert_eq!(installer.uninstall().unwrap(), 0);
    }

    #[test]
    fn test_install_rejects_non_object_settings() {
        let dir = create_test_dir();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let result = HookInstaller::new(&path, HOOK).install();
        assert!(matches!(result, Err(NotchError::HookInstallError(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2]");
    }

    #[test]
    fn test_invalid_json_is_not_overwritten() {
        let dir = create_test_dir();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{oops").unwrap();

        let installer = HookInstaller::new(&path, HOOK);
        assert!(installer.install().is_err());
        assert!(!installer.is_installed());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{oops");
    }
}
