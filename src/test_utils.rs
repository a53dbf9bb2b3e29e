#![expect(
    clippy::unwrap_used,
    reason = "Test utilities use .unwrap() for brevity"
)]

//! Shared helpers for unit tests.
//!
//! Only compiled during testing (`#[cfg(test)]`).

use crate::server::payload::HookMessage;
use crate::session::{SessionStats, StateEvent, StateManager};
use crate::config::NotchConfig;
use std::sync::{Mutex, PoisonError, mpsc};
use tempfile::TempDir;

/// Serializes tests that point APPDATA somewhere else
static APPDATA_LOCK: Mutex<()> = Mutex::new(());

/// Temporary directory removed when dropped
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Points APPDATA at a temporary directory for the lifetime of the guard
///
/// Settings, stats and logs all resolve their paths through APPDATA, so tests that
/// exercise the default locations hold this guard. The lock keeps two such tests from
/// overwriting each other's value; tests that never touch APPDATA run in parallel.
pub struct AppdataGuard {
    original: Option<String>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[expect(
    unsafe_code,
    reason = "Test-only environment mutation, serialized by APPDATA_LOCK"
)]
impl AppdataGuard {
    /// Set APPDATA to `temp_dir` until the guard is dropped
    pub fn new(temp_dir: &TempDir) -> Self {
        // A failed test must not wedge the others
        let lock = APPDATA_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let original = std::env::var("APPDATA").ok();

        // SAFETY: writers are serialized by APPDATA_LOCK and the value is restored on drop
        unsafe {
            std::env::set_var("APPDATA", temp_dir.path());
        }
        Self {
            original,
            _lock: lock,
        }
    }
}

#[expect(
    unsafe_code,
    reason = "Test-only environment mutation, serialized by APPDATA_LOCK"
)]
impl Drop for AppdataGuard {
    fn drop(&mut self) {
        // SAFETY: still holding APPDATA_LOCK
        unsafe {
            match &self.original {
                Some(original) => std::env::set_var("APPDATA", original),
                None => std::env::remove_var("APPDATA"),
            }
        }
    }
}

/// Build a hook message from a JSON body
pub fn hook_message(body: serde_json::Value) -> HookMessage {
    HookMessage::Hook(serde_json::from_value(body).unwrap())
}

/// State manager with the embedded design config and in-memory stats
pub fn state_manager() -> (StateManager, mpsc::Receiver<StateEvent>) {
    let (tx, rx) = mpsc::channel();
    (
        StateManager::new(NotchConfig::embedded(), SessionStats::in_memory(), tx),
        rx,
    )
}
