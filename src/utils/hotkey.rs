//! Global hotkey parsing and registration
//!
//! Hotkeys are written like `ctrl+shift+n` or `alt+f1`. On Windows the hotkey is
//! registered with `RegisterHotKey` on a dedicated thread that runs its own message
//! loop and forwards presses to the controller.

use crate::controller::AppMessage;
use crate::error::{NotchError, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::sync::mpsc;

/// `MOD_ALT`
pub const MOD_ALT: u32 = 0x0001;
/// `MOD_CONTROL`
pub const MOD_CONTROL: u32 = 0x0002;
/// `MOD_SHIFT`
pub const MOD_SHIFT: u32 = 0x0004;
/// `MOD_NOREPEAT`, always set so holding the keys fires once
pub const MOD_NOREPEAT: u32 = 0x4000;
/// `WM_HOTKEY`
pub const WM_HOTKEY: u32 = 0x0312;
/// Id of our single registered hotkey
pub const HOTKEY_ID: i32 = 1;

static HOTKEY_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:ctrl|control|shift|alt)\+){1,3}(?:[a-z0-9]|f(?:[1-9]|1[0-9]|2[0-4]))$")
        .ok()
});

fn matches_pattern(s: &str) -> bool {
    HOTKEY_PATTERN.as_ref().is_some_and(|re| re.is_match(s))
}

/// A parsed hotkey ready for `RegisterHotKey`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    /// `MOD_*` flags, including [`MOD_NOREPEAT`]
    pub modifiers: u32,
    /// Virtual key code
    pub vk: u32,
}

/// Parse a hotkey string; `None` for empty or invalid input
pub fn parse_hotkey(hotkey: &str) -> Option<Hotkey> {
    let hotkey = hotkey.trim().to_lowercase();
    if hotkey.is_empty() || !matches_pattern(&hotkey) {
        return None;
    }

    let (modifier_part, key) = hotkey.rsplit_once('+')?;
    let mut modifiers = MOD_NOREPEAT;
    for modifier in modifier_part.split('+') {
        modifiers |= match modifier {
            "ctrl" | "control" => MOD_CONTROL,
            "shift" => MOD_SHIFT,
            "alt" => MOD_ALT,
            _ => return None,
        };
    }

    let vk = match key.strip_prefix('f') {
        Some(n) if !n.is_empty() => 0x70 + n.parse::<u32>().ok()? - 1,
        _ => {
            let mut chars = key.chars();
            let ch = chars.next().filter(|c| c.is_ascii_alphanumeric() && chars.next().is_none())?;
            u32::from(ch.to_ascii_uppercase())
        }
    };

    Some(Hotkey { modifiers, vk })
}

/// Whether `value` is a valid hotkey or empty (disabled)
pub fn validate_hotkey_string(value: &str) -> bool {
    value.is_empty() || matches_pattern(value.trim())
}

/// Owns the hotkey listener thread; unregisters on drop
pub struct HotkeyListener {
    #[cfg(windows)]
    thread_id: u32,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl HotkeyListener {
    /// Register `hotkey` and forward presses as [`AppMessage::HotkeyPressed`]
    ///
    /// Returns `Ok(None)` when the hotkey is empty (disabled).
    pub fn start(hotkey: &str, sender: mpsc::SyncSender<AppMessage>) -> Result<Option<Self>> {
        use tracing::info;

        if hotkey.trim().is_empty() {
            info!("Global hotkey disabled");
            return Ok(None);
        }
        let parsed = parse_hotkey(hotkey)
            .ok_or_else(|| NotchError::HotkeyError(format!("Invalid hotkey: {hotkey:?}")))?;

        Self::spawn(hotkey, parsed, sender).map(Some)
    }

    #[cfg(windows)]
    fn spawn(name: &str, hotkey: Hotkey, sender: mpsc::SyncSender<AppMessage>) -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<u32, String>>(1);
        let name = name.to_string();

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || run_message_loop(&name, hotkey, &sender, &ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => Ok(Self {
                thread_id,
                thread: Some(thread),
            }),
            Ok(Err(reason)) => {
                let _ = thread.join();
                Err(NotchError::HotkeyError(reason))
            }
            Err(_) => Err(NotchError::HotkeyError(
                "Hotkey thread exited during registration".to_string(),
            )),
        }
    }

    #[cfg(not(windows))]
    fn spawn(name: &str, _hotkey: Hotkey, _sender: mpsc::SyncSender<AppMessage>) -> Result<Self> {
        use tracing::debug;

        debug!("Global hotkey {} not supported on this platform", name);
        Ok(Self { thread: None })
    }

    /// Unregister the hotkey and join the listener thread
    #[allow(unsafe_code)] // Windows FFI to wake the message loop
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        #[cfg(windows)]
        unsafe {
            use windows::Win32::Foundation::{LPARAM, WPARAM};
            use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};

            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }

        let _ = thread.join();
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(windows)]
#[allow(unsafe_code)] // Windows FFI for hotkey registration and the message loop
fn run_message_loop(
    name: &str,
    hotkey: Hotkey,
    sender: &mpsc::SyncSender<AppMessage>,
    ready: &mpsc::SyncSender<std::result::Result<u32, String>>,
) {
    use tracing::{debug, info, warn};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        HOT_KEY_MODIFIERS, RegisterHotKey, UnregisterHotKey,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetMessageW, MSG};

    unsafe {
        let thread_id = GetCurrentThreadId();
        if let Err(e) = RegisterHotKey(None, HOTKEY_ID, HOT_KEY_MODIFIERS(hotkey.modifiers), hotkey.vk)
        {
            warn!(
                "RegisterHotKey failed for {} (modifiers={:#06x} vk={:#04x}): {}",
                name, hotkey.modifiers, hotkey.vk, e
            );
            let _ = ready.send(Err(format!("{name} is already in use: {e}")));
            return;
        }
        let _ = ready.send(Ok(thread_id));
        info!("Global hotkey registered: {}", name);

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            if msg.message == WM_HOTKEY && usize::try_from(HOTKEY_ID) == Ok(msg.wParam.0) {
                debug!("Global hotkey pressed");
                if sender.try_send(AppMessage::HotkeyPressed).is_err() {
                    debug!("Controller busy, hotkey press dropped");
                }
            }
        }

        let _ = UnregisterHotKey(None, HOTKEY_ID);
        info!("Global hotkey unregistered");
    }
}
