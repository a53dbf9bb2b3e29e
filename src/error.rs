//! Error types for `claude-notch`
//!
//! This module defines all error types used throughout the application,
//! providing clear error messages and proper error propagation.
//!
//! Error variants use `#[source]` to preserve error chains so the log file
//! shows the underlying cause, not just the top-level message.

use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `claude-notch`
#[derive(Debug, Error)]
pub enum NotchError {
    /// Loading or saving user settings failed
    #[error("Settings error: {0}")]
    SettingsError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A setting value failed validation
    #[error("Invalid value for setting '{key}': {reason}")]
    InvalidSetting {
        /// Setting key as it appears in settings.json
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Setting key is not known
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    /// The hook listener could not be started or failed while running
    #[error("Hook server error: {0}")]
    ServerError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The hook listener port is already bound, usually by another instance
    #[error("Port {0} is already in use")]
    PortInUse(u16),

    /// Session statistics could not be persisted
    #[error("Session stats error: {0}")]
    StatsError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Webhook delivery failed
    #[error("Webhook error: {0}")]
    WebhookError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Global hotkey registration failed
    #[error("Hotkey error: {0}")]
    HotkeyError(String),

    /// Tray icon creation or update failed
    #[error("Tray icon error: {0}")]
    TrayError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The log file or subscriber could not be set up
    #[error("Logging error: {0}")]
    LoggingError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Another instance already holds the single-instance lock
    #[error("Another instance of Claude Notch is already running")]
    AlreadyRunning,

    /// Installing hooks into the CLI settings failed
    #[error("Hook installation failed: {0}")]
    HookInstallError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Windows API error
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApiError(#[from] windows::core::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for `claude-notch` operations
pub type Result<T> = std::result::Result<T, NotchError>;

/// Convert an error to a user-friendly message
///
/// Used for the startup error dialog; the full error chain is only written to the log.
pub fn get_user_friendly_error(error: &NotchError) -> String {
    match error {
        NotchError::PortInUse(port) => format!(
            "Port {port} is already in use.\n\n\
             Another instance of Claude Notch is probably running.\n\
             Check the system tray, or change server_port in settings.json."
        ),
        NotchError::ServerError(_) => "Failed to start the local hook listener.\n\n\
             Claude Code activity will not be shown.\n\
             Try restarting the application."
            .to_string(),
        NotchError::SettingsError(_)
        | NotchError::InvalidSetting { .. }
        | NotchError::UnknownSetting(_) => "Failed to load or save settings.\n\n\
             Your settings may not persist.\n\
             Check that you have write permissions to:\n\
             %APPDATA%\\claude-notch-windows"
            .to_string(),
        NotchError::StatsError(_) => "Failed to record session statistics.\n\n\
             This does not affect activity tracking."
            .to_string(),
        NotchError::WebhookError(e) => format!(
            "Webhook delivery failed:\n\n{e}\n\n\
             Check the webhook URL in settings.json."
        ),
        NotchError::HotkeyError(msg) => format!(
            "Could not register the global hotkey:\n\n{msg}\n\n\
             Another application may already use this key combination."
        ),
        NotchError::TrayError(_) => "Failed to create the system tray icon.\n\n\
             Please ensure Windows Explorer is running."
            .to_string(),
        NotchError::LoggingError(e) => format!(
            "Failed to set up logging:\n\n{e}\n\n\
             The application will run without a log file."
        ),
        NotchError::AlreadyRunning => "Claude Notch is already running.\n\n\
             Look for its icon in the system tray."
            .to_string(),
        NotchError::HookInstallError(e) => format!(
            "Failed to install Claude Code hooks:\n\n{e}\n\n\
             Check that ~/.claude/settings.json is valid JSON and writable."
        ),
        #[cfg(windows)]
        NotchError::WindowsApiError(e) => {
            format!(
                "A Windows API error occurred:\n\n{e}\n\n\
                 Please ensure your Windows installation is up to date."
            )
        }
        NotchError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        NotchError::JsonError(e) => {
            format!(
                "Configuration file is corrupted:\n\n{e}\n\n\
                 The application will use default settings."
            )
        }
    }
}
