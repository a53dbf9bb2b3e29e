//! `claude-notch` - Claude Code activity in the Windows system tray
//!
//! Claude Code hook commands forward lifecycle events (tool use, prompts, session
//! start/end) to a local HTTP listener. A controller thread turns them into per-session
//! state and animates a tray icon that shows which tool is running, for how long, and
//! how full the context window is.
//!
//! # Architecture
//!
//! - `HookServer` accepts `POST /hook`, `/pin` and `/unpin` and serves `/status`
//! - `AppController` owns the `StateManager` and runs the event loop
//! - `view` derives tray and overlay models from session state
//! - `notify` decides on sounds, toasts, error flashes and webhooks
//!
//! # Requirements
//!
//! - Windows 10 or 11 for the tray, sounds, toasts and window focusing
//! - Claude Code with hooks installed (see `utils::setup`)

// Module declarations
pub mod config;
pub mod controller;
pub mod error;
pub mod notify;
pub mod server;
pub mod session;
pub mod utils;
pub mod view;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use error::{NotchError, Result};
