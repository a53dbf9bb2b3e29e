//! Utility modules
//!
//! Provides auto-start management, global hotkeys, hook installation, logging,
//! single instance enforcement and terminal window focusing.

pub mod autostart;
pub mod hotkey;
pub mod logging;
pub mod setup;
pub mod single_instance;
pub mod window_focus;

pub use autostart::AutoStartManager;
pub use hotkey::{HotkeyListener, parse_hotkey, validate_hotkey_string};
pub use logging::init_logging;
pub use setup::HookInstaller;
pub use single_instance::SingleInstanceGuard;

/// Uniformly pick a number in `0..n` (0 when `n` is 0)
///
/// Randomness comes from a v4 UUID, which is plenty for picking labels and lit squares.
pub fn random_below(n: usize) -> usize {
    let Ok(bound) = u128::try_from(n) else {
        return 0;
    };
    if bound == 0 {
        return 0;
    }
    usize::try_from(uuid::Uuid::new_v4().as_u128() % bound).unwrap_or(0)
}
