//! Sound, flash, toast and webhook decisions for state events
//!
//! [`NotificationManager`] only decides what should happen; the controller carries out the
//! returned [`NotificationEffect`]s. Sounds and toasts for the same event type share a
//! cooldown so a burst of errors produces one beep.

use crate::config::UserSettings;
use crate::session::StateEvent;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Minimum time between two sounds or toasts of the same event type
pub const COOLDOWN: Duration = Duration::from_secs(2);

/// System sound played for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Claude Code is waiting on the user
    Attention,
    /// A tool call failed
    Error,
    /// A session ended
    SessionEnd,
}

impl SoundCue {
    /// Event type name, shared with webhook payloads
    pub fn event_type(self) -> &'static str {
        match self {
            Self::Attention => "attention",
            Self::Error => "error",
            Self::SessionEnd => "session_end",
        }
    }
}

/// Something the controller should do in response to a state event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEffect {
    /// Play a system sound
    Sound(SoundCue),
    /// Flash the tray red for the given session
    Flash(String),
    /// Show a desktop toast
    Toast {
        /// Toast title
        title: String,
        /// Toast body
        message: String,
    },
    /// Post to the configured webhook
    Webhook {
        /// `error`, `attention` or `session_end`
        event_type: String,
        /// Message title
        title: String,
        /// Message body
        message: String,
        /// Project the event belongs to
        project: String,
    },
}

/// Turns state events into notification effects
#[derive(Debug, Default)]
pub struct NotificationManager {
    last_fired: HashMap<SoundCue, Instant>,
}

impl NotificationManager {
    /// Manager with no cooldowns running
    pub fn new() -> Self {
        Self::default()
    }

    /// Effects for `event` at `now`
    ///
    /// `project` is the display name of the session the event belongs to. Claude Code
    /// notifications become a toast with their own text and skip the cooldown. Events
    /// other than notifications, errors, attention requests and session ends produce
    /// nothing.
    pub fn effects_for(
        &mut self,
        event: &StateEvent,
        project: &str,
        settings: &UserSettings,
        now: Instant,
    ) -> Vec<NotificationEffect> {
        let (cue, title, message) = match event {
            StateEvent::NotificationReceived { message, .. } => {
                if !settings.toasts_enabled {
                    return Vec::new();
                }
                return vec![NotificationEffect::Toast {
                    title: "Claude Code".to_string(),
                    message: message.clone(),
                }];
            }
            StateEvent::ErrorDetected { tool_name, .. } => (
                SoundCue::Error,
                "Claude Code Error".to_string(),
                format!("Error in {tool_name}"),
            ),
            StateEvent::AttentionNeeded(_) => (
                SoundCue::Attention,
                "Claude Code".to_string(),
                format!("Attention needed in {project}"),
            ),
            StateEvent::SessionEnded(_) => (
                SoundCue::SessionEnd,
                "Claude Code".to_string(),
                format!("Session ended: {project}"),
            ),
            _ => return Vec::new(),
        };

        let mut effects = Vec::new();

        if (settings.sounds_enabled || settings.toasts_enabled) && self.cooled_down(cue, now) {
            if settings.sounds_enabled {
                effects.push(NotificationEffect::Sound(cue));
            }
            if settings.toasts_enabled {
                effects.push(NotificationEffect::Toast {
                    title: title.clone(),
                    message: message.clone(),
                });
            }
        }

        if let StateEvent::ErrorDetected { session_id, .. } = event
            && settings.error_flash_enabled
        {
            effects.push(NotificationEffect::Flash(session_id.clone()));
        }

        if settings.webhook_enabled && !settings.webhook_url.trim().is_empty() {
            effects.push(NotificationEffect::Webhook {
                event_type: cue.event_type().to_string(),
                title,
                message,
                project: project.to_string(),
            });
        }

        effects
    }

    /// Claim the cooldown slot for `cue`
    fn cooled_down(&mut self, cue: SoundCue, now: Instant) -> bool {
        use tracing::debug;

        if let Some(last) = self.last_fired.get(&cue)
            && now.saturating_duration_since(*last) < COOLDOWN
        {
            debug!("Skipping {} notification during cooldown", cue.event_type());
            return false;
        }
        self.last_fired.insert(cue, now);
        true
    }
}

/// Play the system sound for `cue`
#[cfg(windows)]
pub fn play_sound(cue: SoundCue) {
    use tracing::debug;
    use windows::Win32::UI::WindowsAndMessaging::{
        MB_ICONASTERISK, MB_ICONEXCLAMATION, MB_ICONHAND, MessageBeep,
    };

    let style = match cue {
        SoundCue::Attention => MB_ICONEXCLAMATION,
        SoundCue::Error => MB_ICONHAND,
        SoundCue::SessionEnd => MB_ICONASTERISK,
    };

    // SAFETY: MessageBeep takes no pointers and only queues a system sound
    #[allow(unsafe_code)] // Windows FFI for system sounds
    let result = unsafe { MessageBeep(style) };
    if let Err(e) = result {
        debug!("Failed to play sound '{}': {}", cue.event_type(), e);
    }
}

/// Play the system sound for `cue`
#[cfg(not(windows))]
pub fn play_sound(cue: SoundCue) {
    use tracing::debug;
    debug!("System sounds unavailable on this platform ({})", cue.event_type());
}

/// Show a desktop toast
#[cfg(windows)]
pub fn show_toast(title: &str, message: &str) {
    use tauri_winrt_notification::Toast;
    use tracing::debug;

    if let Err(e) = Toast::new(Toast::POWERSHELL_APP_ID)
        .title(title)
        .text1(message)
        .show()
    {
        debug!("Failed to show toast: {}", e);
    }
}

/// Show a desktop toast
#[cfg(not(windows))]
pub fn show_toast(title: &str, message: &str) {
    use tracing::debug;
    debug!("Toasts unavailable on this platform: {} - {}", title, message);
}
