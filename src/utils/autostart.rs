//! Auto-start registry management
//!
//! Launch on login is a value under HKCU\Software\Microsoft\Windows\CurrentVersion\Run
//! pointing at the current executable.

use crate::error::Result;

/// Registry key holding per-user startup entries
pub const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

/// Value name of our startup entry
pub const RUN_VALUE_NAME: &str = "ClaudeCodeNotch";

/// Auto-start manager
pub struct AutoStartManager;

#[cfg(windows)]
impl AutoStartManager {
    /// Check if the startup entry exists
    pub fn is_enabled() -> Result<bool> {
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let Ok(run) = hkcu.open_subkey_with_flags(RUN_KEY, KEY_READ) else {
            return Ok(false);
        };
        Ok(run.get_value::<String, _>(RUN_VALUE_NAME).is_ok())
    }

    /// Register the current executable to start on login
    pub fn enable() -> Result<()> {
        use tracing::info;
        use winreg::RegKey;
        use winreg::enums::HKEY_CURRENT_USER;

        let command = format!("\"{}\"", std::env::current_exe()?.display());
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let (run, _) = hkcu.create_subkey(RUN_KEY)?;
        run.set_value(RUN_VALUE_NAME, &command)?;
        info!("Added startup entry: {}", command);
        Ok(())
    }

    /// Remove the startup entry; a missing entry is not an error
    pub fn disable() -> Result<()> {
        use tracing::info;
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, KEY_SET_VALUE};

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let run = hkcu.open_subkey_with_flags(RUN_KEY, KEY_SET_VALUE)?;
        match run.delete_value(RUN_VALUE_NAME) {
            Ok(()) => {
                info!("Removed startup entry");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(not(windows))]
impl AutoStartManager {
    /// Always false off Windows
    pub fn is_enabled() -> Result<bool> {
        Ok(false)
    }

    /// No-op off Windows
    pub fn enable() -> Result<()> {
        Ok(())
    }

    /// No-op off Windows
    pub fn disable() -> Result<()> {
        Ok(())
    }
}

impl AutoStartManager {
    /// Make the registry match the `launch_on_startup` setting
    pub fn sync(enabled: bool) -> Result<()> {
        if enabled == Self::is_enabled()? {
            return Ok(());
        }
        if enabled { Self::enable() } else { Self::disable() }
    }
}
