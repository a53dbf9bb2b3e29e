//! Application controller implementation
//!
//! [`AppController`] owns the [`StateManager`] and runs the single loop that applies
//! hook events, token readings, hotkey presses and tray menu commands. After every
//! message (or 100ms without one) it drains the state events, expires grace periods,
//! publishes the `/status` snapshot and pushes a fresh [`TrayModel`] to the GUI thread
//! when the icon changed.

use crate::config::{NotchConfig, SettingKey, SettingsManager, UserSettings};
use crate::error::get_user_friendly_error;
use crate::notify::notification_manager::{play_sound, show_toast};
use crate::notify::{NotificationEffect, NotificationManager, WebhookDispatcher};
use crate::server::{HookMessage, StatusHandle};
use crate::session::{SessionStats, StateEvent, StateManager, TokenStats, TranscriptReader};
use crate::utils::logging::get_log_dir;
use crate::utils::{AutoStartManager, HookInstaller, HotkeyListener, window_focus};
use crate::view::{ActivityIndicator, ErrorFlash, OverlayModel, TrayModel, TrayTarget};
use serde_json::Value;
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime};

/// How long the loop waits for a message before running housekeeping anyway
pub const LOOP_TIMEOUT: Duration = Duration::from_millis(100);

/// Interval of stale session cleanup and the settings file check
pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the controller to GUI channel
pub const TRAY_CHANNEL_CAPACITY: usize = 32;

const TOAST_TITLE: &str = "Claude Notch";

/// Tray menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    /// Flip `launch_on_startup`
    ToggleStartup,
    /// Open settings.json in the default editor
    OpenSettings,
    /// Open the log folder
    OpenLogs,
    /// Register the hook forwarder in Claude Code's settings
    InstallHooks,
    /// Post a test message to the configured webhook
    SendTestWebhook,
    /// Restore default settings
    ResetSettings,
    /// Bring the current session's terminal to the front
    FocusTerminal,
    /// Exit the application
    Quit,
}

impl MenuCommand {
    /// Menu order
    pub const ALL: [Self; 8] = [
        Self::FocusTerminal,
        Self::InstallHooks,
        Self::SendTestWebhook,
        Self::OpenSettings,
        Self::OpenLogs,
        Self::ToggleStartup,
        Self::ResetSettings,
        Self::Quit,
    ];

    /// Stable menu item id
    pub fn id(self) -> &'static str {
        match self {
            Self::ToggleStartup => "toggle_startup",
            Self::OpenSettings => "open_settings",
            Self::OpenLogs => "open_logs",
            Self::InstallHooks => "install_hooks",
            Self::SendTestWebhook => "send_test_webhook",
            Self::ResetSettings => "reset_settings",
            Self::FocusTerminal => "focus_terminal",
            Self::Quit => "quit",
        }
    }

    /// Command for a menu item id
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.id() == id)
    }

    /// Menu item text
    pub fn label(self) -> &'static str {
        match self {
            Self::ToggleStartup => "Launch on Startup",
            Self::OpenSettings => "Open Settings",
            Self::OpenLogs => "Open Logs",
            Self::InstallHooks => "Install Claude Code Hooks",
            Self::SendTestWebhook => "Send Test Webhook",
            Self::ResetSettings => "Reset Settings",
            Self::FocusTerminal => "Focus Terminal",
            Self::Quit => "Quit",
        }
    }
}

/// Everything the controller loop reacts to
#[derive(Debug)]
pub enum AppMessage {
    /// Request accepted by the hook listener
    Hook(HookMessage),
    /// Token usage read from a session transcript
    TokenUsage {
        /// Session the transcript belongs to
        session_id: String,
        /// Usage of the last assistant turn
        usage: TokenStats,
    },
    /// The global hotkey was pressed
    HotkeyPressed,
    /// A tray menu item was clicked
    Menu(MenuCommand),
    /// Stop the loop
    Shutdown,
}

/// Main application controller
pub struct AppController {
    state: StateManager,
    state_events: mpsc::Receiver<StateEvent>,
    settings: SettingsManager,
    settings_modified: Option<SystemTime>,
    notifications: NotificationManager,
    webhook: WebhookDispatcher,
    indicator: ActivityIndicator,
    tray_target: Option<TrayTarget>,
    last_tray: Option<TrayModel>,
    error_flash: ErrorFlash,
    status: StatusHandle,
    app_sender: mpsc::SyncSender<AppMessage>,
    tray_sender: mpsc::SyncSender<TrayModel>,
    hotkey: Option<HotkeyListener>,
    hotkey_enabled: bool,
    last_housekeeping: Instant,
}

impl AppController {
    /// Create the controller
    ///
    /// `app_sender` is handed to transcript readers and the hotkey listener so their
    /// results come back through the same loop. Tray frames go out on `tray_sender`.
    pub fn new(
        config: NotchConfig,
        stats: SessionStats,
        settings: SettingsManager,
        status: StatusHandle,
        app_sender: mpsc::SyncSender<AppMessage>,
        tray_sender: mpsc::SyncSender<TrayModel>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let mut state = StateManager::new(config, stats, event_tx);
        state.apply_settings(settings.settings());

        let now = Instant::now();
        Self {
            state,
            state_events: event_rx,
            settings_modified: file_modified(settings.path()),
            webhook: WebhookDispatcher::new(&settings.settings().webhook_url),
            settings,
            notifications: NotificationManager::new(),
            indicator: ActivityIndicator::new(now),
            tray_target: None,
            last_tray: None,
            error_flash: ErrorFlash::default(),
            status,
            app_sender,
            tray_sender,
            hotkey: None,
            hotkey_enabled: false,
            last_housekeeping: now,
        }
    }

    /// Session state
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Current user settings
    pub fn settings(&self) -> &UserSettings {
        self.settings.settings()
    }

    /// Register the global hotkey from the current settings
    ///
    /// Also re-registers it when the setting changes later. Failure is logged; the app
    /// keeps running without a hotkey.
    pub fn start_hotkey(&mut self) {
        use tracing::warn;

        self.hotkey_enabled = true;
        if let Some(mut previous) = self.hotkey.take() {
            previous.stop();
        }

        match HotkeyListener::start(&self.settings.settings().global_hotkey, self.app_sender.clone()) {
            Ok(listener) => self.hotkey = listener,
            Err(e) => warn!("Failed to register global hotkey: {}", e),
        }
    }

    /// Run the controller loop on a new thread until `Shutdown` or `Quit`
    pub fn spawn_event_loop(
        mut self,
        receiver: mpsc::Receiver<AppMessage>,
    ) -> std::io::Result<std::thread::JoinHandle<()>> {
        std::thread::Builder::new()
            .name("controller".to_string())
            .spawn(move || self.run(&receiver))
    }

    /// Run the controller loop on the current thread
    pub fn run(&mut self, receiver: &mpsc::Receiver<AppMessage>) {
        use std::sync::mpsc::RecvTimeoutError;
        use tracing::{info, warn};

        info!("Entering controller loop");
        loop {
            match receiver.recv_timeout(LOOP_TIMEOUT) {
                Ok(message) => {
                    if !self.handle_message(message, Instant::now()) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Controller channel disconnected. Exiting loop.");
                    break;
                }
            }

            self.update(Instant::now());
        }

        if let Some(mut hotkey) = self.hotkey.take() {
            hotkey.stop();
        }
        info!("Controller loop exited");
    }

    /// Apply one message
    ///
    /// Returns false when the loop should stop.
    pub fn handle_message(&mut self, message: AppMessage, now: Instant) -> bool {
        use tracing::{debug, info};

        match message {
            AppMessage::Hook(hook) => self.state.handle_message_at(hook, now),
            AppMessage::TokenUsage { session_id, usage } => {
                if !self.state.apply_token_update(&session_id, usage) {
                    debug!("Dropping token usage for unknown session {}", session_id);
                }
            }
            AppMessage::HotkeyPressed => {
                self.focus_current_terminal();
            }
            AppMessage::Menu(MenuCommand::Quit) | AppMessage::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
            AppMessage::Menu(command) => self.handle_menu(command),
        }
        true
    }

    /// Housekeeping run after every loop iteration
    pub fn update(&mut self, now: Instant) {
        use tracing::debug;

        self.drain_state_events(now);
        if self.state.tick(now) {
            self.drain_state_events(now);
        }

        if now.saturating_duration_since(self.last_housekeeping) >= HOUSEKEEPING_INTERVAL {
            self.last_housekeeping = now;
            let removed = self.state.cleanup_stale_sessions(now);
            if !removed.is_empty() {
                debug!("Cleaned up {} stale session(s)", removed.len());
            }
            self.reload_settings_if_changed();
        }

        *self.status.write() = self.state.status_snapshot(now);
        self.update_tray(now);
    }

    /// Pick up edits made to settings.json outside the app
    ///
    /// Returns whether settings changed.
    pub fn reload_settings_if_changed(&mut self) -> bool {
        use tracing::info;

        let modified = file_modified(self.settings.path());
        if modified.is_none() || modified == self.settings_modified {
            return false;
        }
        self.settings_modified = modified;

        let previous = self.settings.settings().clone();
        self.settings = SettingsManager::load_from(self.settings.path().to_path_buf());
        if *self.settings.settings() == previous {
            return false;
        }

        info!("Settings file changed, applying new settings");
        self.apply_settings_change(&previous);
        true
    }

    fn drain_state_events(&mut self, now: Instant) {
        while let Ok(event) = self.state_events.try_recv() {
            self.handle_state_event(&event, now);
        }
    }

    fn handle_state_event(&mut self, event: &StateEvent, now: Instant) {
        use tracing::{debug, info, warn};

        match event {
            StateEvent::TranscriptRequested { session_id, path } => {
                if let Err(e) =
                    TranscriptReader::spawn_read(session_id.clone(), path.clone(), self.app_sender.clone())
                {
                    warn!("Failed to spawn transcript reader: {}", e);
                }
            }
            StateEvent::TerminalLookupRequested { session_id, pid } => {
                let window = window_focus::find_terminal_window(*pid);
                debug!("Terminal window for session {}: {:?}", session_id, window);
                self.state.set_terminal_window(session_id, window);
            }
            StateEvent::NotificationReceived { .. }
            | StateEvent::ErrorDetected { .. }
            | StateEvent::AttentionNeeded(_)
            | StateEvent::SessionEnded(_) => {
                if let StateEvent::NotificationReceived { session_id, message } = event {
                    info!("Notification from session {}: {}", session_id, message);
                }
                for effect in self.notification_effects(event, now) {
                    self.apply_effect(effect, now);
                }
            }
            StateEvent::SessionUpdated(_)
            | StateEvent::ToolStarted { .. }
            | StateEvent::ToolEnded { .. }
            | StateEvent::ActivityChanged => {}
        }
    }

    fn notification_effects(&mut self, event: &StateEvent, now: Instant) -> Vec<NotificationEffect> {
        let session_id = match event {
            StateEvent::NotificationReceived { session_id, .. }
            | StateEvent::ErrorDetected { session_id, .. }
            | StateEvent::AttentionNeeded(session_id)
            | StateEvent::SessionEnded(session_id) => session_id.as_str(),
            _ => return Vec::new(),
        };
        let project = self
            .state
            .session(session_id)
            .map(|session| session.display_name())
            .unwrap_or_default();
        self.notifications
            .effects_for(event, &project, self.settings.settings(), now)
    }

    fn apply_effect(&mut self, effect: NotificationEffect, now: Instant) {
        use tracing::debug;

        match effect {
            NotificationEffect::Sound(cue) => play_sound(cue),
            NotificationEffect::Flash(session_id) => {
                debug!("Error flash for session {}", session_id);
                self.error_flash.trigger(now);
            }
            NotificationEffect::Toast { title, message } => show_toast(&title, &message),
            NotificationEffect::Webhook {
                event_type,
                title,
                message,
                project,
            } => {
                self.webhook.send(&event_type, &title, &message, &project);
            }
        }
    }

    fn update_tray(&mut self, now: Instant) {
        use std::sync::mpsc::TrySendError;
        use tracing::debug;

        let settings = self.settings.settings();
        let config = self.state.config();

        let mut target = TrayTarget::from_state(&self.state, settings, now);
        let overlay = OverlayModel::build(&self.state, settings, now);
        if overlay.visible {
            if let Some(card) = self
                .state
                .current_session()
                .and_then(|session| overlay.card(&session.session_id))
            {
                target.decorate(card);
            }
            if overlay.cards.len() > 1 {
                target.tooltip = overlay.tooltip();
            }
        }

        if self
            .tray_target
            .as_ref()
            .is_none_or(|current| current.animation_differs(&target))
        {
            target.configure(&mut self.indicator, config, settings, now);
        } else {
            self.indicator.step(now);
        }

        let model = TrayModel::compose(&target, &self.indicator, config, self.error_flash.is_active(now));
        self.tray_target = Some(target);

        if self.last_tray.as_ref() == Some(&model) {
            return;
        }
        match self.tray_sender.try_send(model.clone()) {
            Ok(()) => self.last_tray = Some(model),
            Err(TrySendError::Full(_)) => debug!("Tray channel full, retrying next tick"),
            Err(TrySendError::Disconnected(_)) => debug!("Tray receiver gone, dropping frame"),
        }
    }

    fn handle_menu(&mut self, command: MenuCommand) {
        use tracing::{info, warn};

        info!("Menu command: {:?}", command);
        match command {
            MenuCommand::ToggleStartup => {
                let enabled = !self.settings.settings().launch_on_startup;
                self.change_setting(SettingKey::LaunchOnStartup, &Value::Bool(enabled));
            }
            MenuCommand::OpenSettings => {
                if !self.settings.path().exists() {
                    if let Err(e) = self.settings.save() {
                        warn!("Failed to write settings before opening them: {}", e);
                    }
                    self.settings_modified = file_modified(self.settings.path());
                }
                open_path(self.settings.path());
            }
            MenuCommand::OpenLogs => open_path(&get_log_dir()),
            MenuCommand::InstallHooks => {
                match HookInstaller::for_current_user().and_then(|installer| installer.install()) {
                    Ok(0) => show_toast(TOAST_TITLE, "Hooks are already installed"),
                    Ok(added) => show_toast(TOAST_TITLE, &format!("Installed {added} hook(s)")),
                    Err(e) => {
                        warn!("Hook installation failed: {}", e);
                        show_toast(TOAST_TITLE, &get_user_friendly_error(&e));
                    }
                }
            }
            MenuCommand::SendTestWebhook => self.send_test_webhook(),
            MenuCommand::ResetSettings => {
                let previous = self.settings.settings().clone();
                match self.settings.reset_to_defaults() {
                    Ok(changed) if changed.is_empty() => {}
                    Ok(_) => self.apply_settings_change(&previous),
                    Err(e) => warn!("Failed to reset settings: {}", e),
                }
                self.settings_modified = file_modified(self.settings.path());
            }
            MenuCommand::FocusTerminal => {
                self.focus_current_terminal();
            }
            MenuCommand::Quit => {}
        }
    }

    fn send_test_webhook(&self) {
        use tracing::warn;

        let url = self.settings.settings().webhook_url.trim().to_string();
        if url.is_empty() {
            show_toast(TOAST_TITLE, "No webhook URL configured");
            return;
        }

        // send_test blocks for up to the request timeout
        let spawned = std::thread::Builder::new()
            .name("webhook-test".to_string())
            .spawn(move || {
                let (ok, message) = WebhookDispatcher::default().send_test(&url);
                let title = if ok { "Webhook test sent" } else { "Webhook test failed" };
                show_toast(title, &message);
            });
        if let Err(e) = spawned {
            warn!("Failed to spawn webhook test: {}", e);
        }
    }

    fn change_setting(&mut self, key: SettingKey, value: &Value) {
        use tracing::warn;

        let previous = self.settings.settings().clone();
        match self.settings.set(key, value) {
            Ok(true) => {
                self.settings_modified = file_modified(self.settings.path());
                self.apply_settings_change(&previous);
            }
            Ok(false) => {}
            Err(e) => warn!("Failed to change setting {}: {}", key, e),
        }
    }

    fn apply_settings_change(&mut self, previous: &UserSettings) {
        use tracing::warn;

        let current = self.settings.settings().clone();
        self.state.apply_settings(&current);

        if current.webhook_url != previous.webhook_url {
            self.webhook.set_url(&current.webhook_url);
        }
        if current.global_hotkey != previous.global_hotkey && self.hotkey_enabled {
            self.start_hotkey();
        }
        if current.launch_on_startup != previous.launch_on_startup
            && let Err(e) = AutoStartManager::sync(current.launch_on_startup)
        {
            warn!("Failed to update launch on startup: {}", e);
        }

        // Speed and animation settings only apply on reconfigure
        self.tray_target = None;
    }

    /// Focus the terminal of the session the tray describes
    fn focus_current_terminal(&self) -> bool {
        use tracing::debug;

        let Some(session) = self.state.current_session() else {
            debug!("No session to focus");
            return false;
        };
        match session.terminal_window {
            Some(window) if window_focus::is_window_valid(window) => window_focus::focus_window(window),
            _ => {
                debug!("No terminal window known for session {}", session.session_id);
                false
            }
        }
    }
}

fn file_modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(windows)]
fn open_path(path: &Path) {
    use tracing::warn;

    if let Err(e) = open::that(path) {
        warn!("Failed to open {}: {}", path.display(), e);
    }
}

#[cfg(not(windows))]
fn open_path(path: &Path) {
    use tracing::info;
    info!("Open {} manually", path.display());
}
