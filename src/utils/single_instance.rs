//! Single instance enforcement
//!
//! A second copy of the app would fight over the hook port and the tray, so startup
//! takes a Windows named mutex first.

use crate::error::Result;

#[cfg(windows)]
use crate::error::NotchError;

#[cfg(windows)]
use windows::Win32::Foundation::{CloseHandle, HANDLE};
#[cfg(windows)]
use windows::Win32::System::Threading::{CreateMutexW, OpenMutexW, SYNCHRONIZATION_SYNCHRONIZE};

/// Name of the session-wide mutex
#[cfg(windows)]
const MUTEX_NAME: &str = "Local\\ClaudeNotchWindows_SingleInstance";

/// Named mutex held for the lifetime of the process (released on drop)
#[cfg(windows)]
pub struct SingleInstanceGuard {
    mutex_handle: HANDLE,
}

#[cfg(windows)]
impl SingleInstanceGuard {
    /// Acquire the guard, failing with [`NotchError::AlreadyRunning`] if another instance holds it
    #[allow(unsafe_code)] // Windows FFI for mutex
    pub fn new() -> Result<Self> {
        use tracing::{debug, warn};
        use windows::core::HSTRING;

        let mutex_name = HSTRING::from(MUTEX_NAME);

        unsafe {
            if let Ok(existing_handle) = OpenMutexW(SYNCHRONIZATION_SYNCHRONIZE, false, &mutex_name)
            {
                warn!("Another instance of Claude Notch is already running");
                let _ = CloseHandle(existing_handle);
                return Err(NotchError::AlreadyRunning);
            }

            let mutex_handle = CreateMutexW(None, true, &mutex_name)?;
            debug!("Single instance mutex {} acquired", MUTEX_NAME);
            Ok(Self { mutex_handle })
        }
    }
}

#[cfg(windows)]
impl Drop for SingleInstanceGuard {
    #[allow(unsafe_code)] // Windows FFI for mutex cleanup
    fn drop(&mut self) {
        use tracing::debug;

        unsafe {
            let _ = CloseHandle(self.mutex_handle);
        }
        debug!("Single instance mutex released");
    }
}

/// Stub for non-Windows platforms; the hook port bind still catches duplicates
#[cfg(not(windows))]
pub struct SingleInstanceGuard;

#[cfg(not(windows))]
impl SingleInstanceGuard {
    /// Always succeeds
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(windows)]
    fn test_second_guard_fails_until_first_dropped() {
        let first = SingleInstanceGuard::new();
        assert!(first.is_ok());

        let second = SingleInstanceGuard::new();
        assert!(matches!(second, Err(NotchError::AlreadyRunning)));

        drop(first);
        assert!(SingleInstanceGuard::new().is_ok());
    }

    #[test]
    #[cfg(not(windows))]
    fn test_stub_always_succeeds() {
        let first = SingleInstanceGuard::new();
        let second = SingleInstanceGuard::new();
        assert!(first.is_ok());
        assert!(second.is_ok());
    }
}
