//! Session state machine
//!
//! Turns hook requests into session state. Everything here runs on the controller
//! thread; side effects (notifications, transcript reads, window lookups) are
//! requested through [`StateEvent`]s and carried out by the controller.

use crate::config::{NotchConfig, UserSettings};
use crate::server::payload::{HookEvent, HookMessage, HookPayload, PinPayload};
use crate::session::models::{ActiveTool, SessionState, THINKING_TOOL, TokenStats};
use crate::session::stats::SessionStats;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Context window assumed for the context percentage
pub const CONTEXT_WINDOW_TOKENS: u64 = 200_000;

/// Minimum time between transcript reads of one session
pub const TOKEN_READ_INTERVAL: Duration = Duration::from_secs(5);

/// Patterns in Bash stderr that indicate a failed command
///
/// Stdout is never scanned; plenty of successful commands print "error".
const STDERR_ERROR_PATTERNS: [&str; 4] = [
    "command not found",
    "No such file or directory",
    "Permission denied",
    "Traceback (most recent call last)",
];

/// Something observers of the state machine may react to
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// A session changed
    SessionUpdated(String),
    /// A session reported `SessionEnd`
    SessionEnded(String),
    /// A tool started
    ToolStarted {
        /// Session id
        session_id: String,
        /// Tool name
        tool_name: String,
    },
    /// A tool finished
    ToolEnded {
        /// Session id
        session_id: String,
        /// Tool name
        tool_name: String,
    },
    /// The set of visible activity changed
    ActivityChanged,
    /// Claude Code sent a notification
    NotificationReceived {
        /// Session id
        session_id: String,
        /// Notification text
        message: String,
    },
    /// A tool call failed
    ErrorDetected {
        /// Session id
        session_id: String,
        /// Tool name
        tool_name: String,
    },
    /// Claude Code is waiting on the user
    AttentionNeeded(String),
    /// The transcript should be read for token usage
    TranscriptRequested {
        /// Session id
        session_id: String,
        /// Transcript file
        path: PathBuf,
    },
    /// The terminal hosting a session should be located
    TerminalLookupRequested {
        /// Session id
        session_id: String,
        /// Pid of the Claude Code process
        pid: u32,
    },
}

/// Central state for all tracked sessions
pub struct StateManager {
    config: NotchConfig,
    sessions: HashMap<String, SessionState>,
    pinned_paths: HashSet<String>,
    active_session_id: Option<String>,
    last_activity_time: Instant,
    idle_timeout: Duration,
    activity_timeout: Duration,
    click_to_focus: bool,
    stats: SessionStats,
    events: mpsc::Sender<StateEvent>,
}

impl StateManager {
    /// Create an empty state manager
    ///
    /// Timeouts start from the design config defaults until settings are applied.
    pub fn new(config: NotchConfig, stats: SessionStats, events: mpsc::Sender<StateEvent>) -> Self {
        let idle_timeout = Duration::from_secs(config.defaults.idle_timeout);
        let activity_timeout = Duration::from_secs(config.defaults.activity_timeout);
        Self {
            config,
            sessions: HashMap::new(),
            pinned_paths: HashSet::new(),
            active_session_id: None,
            last_activity_time: Instant::now(),
            idle_timeout,
            activity_timeout,
            click_to_focus: false,
            stats,
            events,
        }
    }

    /// Design configuration
    pub fn config(&self) -> &NotchConfig {
        &self.config
    }

    /// Persistent tool statistics
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// All tracked sessions
    pub fn sessions(&self) -> &HashMap<String, SessionState> {
        &self.sessions
    }

    /// Session by id
    pub fn session(&self, session_id: &str) -> Option<&SessionState> {
        self.sessions.get(session_id)
    }

    /// Pinned project paths
    pub fn pinned_paths(&self) -> &HashSet<String> {
        &self.pinned_paths
    }

    /// Id of the most recently created session
    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    /// Time of the last hook event
    pub fn last_activity_time(&self) -> Instant {
        self.last_activity_time
    }

    /// Current idle and activity timeouts
    pub fn timeouts(&self) -> (Duration, Duration) {
        (self.idle_timeout, self.activity_timeout)
    }

    /// Set the idle and stale timeouts
    pub fn set_timeouts(&mut self, idle: Duration, activity: Duration) {
        self.idle_timeout = idle;
        self.activity_timeout = activity;
    }

    /// Apply the settings the state machine depends on
    pub fn apply_settings(&mut self, settings: &UserSettings) {
        self.set_timeouts(
            Duration::from_secs(settings.idle_timeout),
            Duration::from_secs(settings.activity_timeout),
        );
        self.click_to_focus = settings.click_to_focus;
    }

    /// Handle a request from the hook listener
    pub fn handle_message(&mut self, message: HookMessage) {
        self.handle_message_at(message, Instant::now());
    }

    /// Like [`StateManager::handle_message`], with an explicit clock
    pub fn handle_message_at(&mut self, message: HookMessage, now: Instant) {
        match message {
            HookMessage::Hook(payload) => self.handle_hook_event(&payload, now),
            HookMessage::Pin(payload) => self.handle_pin(&payload),
            HookMessage::Unpin(_) => self.handle_unpin(),
        }
    }

    fn handle_hook_event(&mut self, payload: &HookPayload, now: Instant) {
        use tracing::debug;

        let event = payload.event();
        let session_id = payload.session_id().to_string();
        debug!(
            "Hook event: {} | tool: {} | session: {}",
            event.as_str(),
            payload.tool.as_deref().unwrap_or("N/A"),
            session_id
        );

        self.last_activity_time = now;
        self.get_or_create_session(&session_id, payload.cwd(), now);
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };
        session.last_activity = now;
        if let Some(mode) = payload.permission_mode() {
            session.permission_mode = mode.to_string();
        }

        match event {
            HookEvent::PreToolUse => self.handle_pre_tool_use(&session_id, payload, now),
            HookEvent::PostToolUse => self.handle_post_tool_use(&session_id, payload, now),
            HookEvent::Stop | HookEvent::SubagentStop => self.handle_stop(&session_id, now),
            HookEvent::SessionStart => self.handle_session_start(&session_id, payload, now),
            HookEvent::SessionEnd => self.handle_session_end(&session_id),
            HookEvent::Notification => self.handle_notification(&session_id, payload),
            HookEvent::UserPromptSubmit => {
                if let Some(session) = self.sessions.get_mut(&session_id) {
                    session.is_active = true;
                }
            }
            HookEvent::Other(name) => debug!("Ignoring hook event '{}'", name),
        }

        self.request_token_read(&session_id, payload, now);
        self.emit(StateEvent::SessionUpdated(session_id));
        self.emit(StateEvent::ActivityChanged);
    }

    fn get_or_create_session(&mut self, session_id: &str, cwd: &str, now: Instant) {
        use tracing::info;

        if self.sessions.contains_key(session_id) {
            return;
        }

        let project_path = if cwd.is_empty() { "Unknown" } else { cwd };
        let session = SessionState::new(session_id, project_path, now);
        info!("New session {} in {}", session_id, session.display_name());
        self.sessions.insert(session_id.to_string(), session);
        self.active_session_id = Some(session_id.to_string());
    }

    fn handle_pre_tool_use(&mut self, session_id: &str, payload: &HookPayload, now: Instant) {
        let tool_name = match payload.tool() {
            "" => "unknown",
            name => name,
        };

        if tool_name == "AskUserQuestion" {
            self.emit(StateEvent::AttentionNeeded(session_id.to_string()));
        }

        let tool = ActiveTool::from_tool_info(self.config.get_tool_info(tool_name), now);
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.grace_deadline = None;
            session.active_tool = Some(tool.clone());
            session.is_active = true;
            session.push_recent_tool(tool);
        }

        self.emit(StateEvent::ToolStarted {
            session_id: session_id.to_string(),
            tool_name: tool_name.to_string(),
        });
    }

    fn handle_post_tool_use(&mut self, session_id: &str, payload: &HookPayload, now: Instant) {
        let finished = self
            .sessions
            .get(session_id)
            .and_then(|s| s.active_tool.clone());

        if let Some(tool) = &finished {
            self.emit(StateEvent::ToolEnded {
                session_id: session_id.to_string(),
                tool_name: tool.tool_name.clone(),
            });
        }

        if payload.tool() == "Bash" && is_bash_error(payload.tool_result()) {
            self.emit(StateEvent::ErrorDetected {
                session_id: session_id.to_string(),
                tool_name: "Bash".to_string(),
            });
        }

        if let Some(tool) = finished.filter(|t| !t.is_thinking()) {
            self.stats.record_tool_use(
                &tool.tool_name,
                &tool.category,
                tool.elapsed_at(now).as_secs_f64(),
            );
        }

        self.start_grace_period(session_id, now);
    }

    fn handle_stop(&mut self, session_id: &str, now: Instant) {
        if let Some(tool) = self.sessions.get(session_id).and_then(|s| s.active_tool.as_ref()) {
            let tool_name = tool.tool_name.clone();
            self.emit(StateEvent::ToolEnded {
                session_id: session_id.to_string(),
                tool_name,
            });
        }

        self.start_grace_period(session_id, now);
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.is_active = false;
        }
    }

    fn handle_session_start(&mut self, session_id: &str, payload: &HookPayload, now: Instant) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.start_time = now;
            session.is_active = true;
        }

        if self.click_to_focus
            && let Some(pid) = payload.pid.filter(|pid| *pid != 0)
        {
            self.emit(StateEvent::TerminalLookupRequested {
                session_id: session_id.to_string(),
                pid,
            });
        }
    }

    fn handle_session_end(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.is_active = false;
        }
        self.emit(StateEvent::SessionEnded(session_id.to_string()));
        self.stats.increment_session_count();
    }

    fn handle_notification(&mut self, session_id: &str, payload: &HookPayload) {
        let message = notification_text(payload.tool_input.as_ref());
        if !message.is_empty() {
            self.emit(StateEvent::NotificationReceived {
                session_id: session_id.to_string(),
                message,
            });
        }
    }

    fn handle_pin(&mut self, payload: &PinPayload) {
        use tracing::info;

        if let Some(cwd) = payload.cwd.as_deref().filter(|c| !c.is_empty()) {
            self.pinned_paths.insert(cwd.to_string());
            info!("Pinned session: {}", cwd);
        }
        self.emit(StateEvent::ActivityChanged);
    }

    fn handle_unpin(&mut self) {
        use tracing::info;

        self.pinned_paths.clear();
        info!("Unpinned all sessions");
        self.emit(StateEvent::ActivityChanged);
    }

    /// Show a thinking label until the next tool starts or the grace period ends
    fn start_grace_period(&mut self, session_id: &str, now: Instant) {
        let verbs = self.config.fun_verbs();
        let verb = verbs[crate::utils::random_below(verbs.len())].clone();

        let category = self.config.thinking_category();
        let info = self.config.category(&category);
        let field = |value: Option<&String>, fallback: &str| {
            value.cloned().unwrap_or_else(|| fallback.to_string())
        };

        let mut tool = ActiveTool::new(THINKING_TOOL, now);
        tool.display_name = verb;
        tool.color = field(info.and_then(|c| c.color.as_ref()), "orange");
        tool.pattern = field(info.and_then(|c| c.pattern.as_ref()), "cogitate");
        tool.attention = field(info.and_then(|c| c.attention.as_ref()), "ambient");
        tool.category = category;

        let deadline = now + self.config.grace_period();
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.active_tool = Some(tool);
            session.grace_deadline = Some(deadline);
        }
    }

    /// Expire grace periods that ended before `now`
    ///
    /// Returns whether any session changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut expired = Vec::new();
        for session in self.sessions.values_mut() {
            let Some(deadline) = session.grace_deadline else {
                continue;
            };
            if deadline > now {
                continue;
            }
            session.grace_deadline = None;
            if session.active_tool.as_ref().is_some_and(ActiveTool::is_thinking) {
                session.active_tool = None;
                expired.push(session.session_id.clone());
            }
        }

        let changed = !expired.is_empty();
        for session_id in expired {
            self.emit(StateEvent::SessionUpdated(session_id));
        }
        if changed {
            self.emit(StateEvent::ActivityChanged);
        }
        changed
    }

    fn request_token_read(&mut self, session_id: &str, payload: &HookPayload, now: Instant) {
        let Some(path) = payload.transcript_path() else {
            return;
        };
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        if session
            .last_token_read
            .is_some_and(|last| now.saturating_duration_since(last) < TOKEN_READ_INTERVAL)
        {
            return;
        }

        session.last_token_read = Some(now);
        self.emit(StateEvent::TranscriptRequested {
            session_id: session_id.to_string(),
            path: PathBuf::from(path),
        });
    }

    /// Store token usage read from a transcript
    ///
    /// Returns false when the session no longer exists.
    pub fn apply_token_update(&mut self, session_id: &str, usage: TokenStats) -> bool {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return false;
        };

        session.token_stats = usage;
        session.context_tokens =
            usage.input_tokens + usage.cache_creation_tokens + usage.cache_read_tokens;
        #[expect(
            clippy::cast_precision_loss,
            reason = "Token counts stay far below 2^52, precision loss is impossible in practice"
        )]
        let percent = session.context_tokens as f64 / CONTEXT_WINDOW_TOKENS as f64 * 100.0;
        session.context_percent = percent.min(100.0);

        self.emit(StateEvent::SessionUpdated(session_id.to_string()));
        true
    }

    /// Remember the terminal window of a session
    pub fn set_terminal_window(&mut self, session_id: &str, window: Option<isize>) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.terminal_window = window;
        }
    }

    /// JSON served by `GET /status`
    pub fn status_snapshot(&self, now: Instant) -> Value {
        let mut sessions: Vec<&SessionState> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));

        let sessions: Vec<Value> = sessions
            .into_iter()
            .map(|s| {
                let active_tool = s.active_tool.as_ref().map(|tool| {
                    json!({
                        "tool_name": tool.tool_name,
                        "display_name": tool.display_name,
                        "category": tool.category,
                        "attention": tool.attention,
                        "elapsed_seconds": round1(tool.elapsed_at(now).as_secs_f64()),
                    })
                });
                json!({
                    "session_id": s.session_id,
                    "project_name": s.project_name,
                    "project_path": s.project_path,
                    "is_active": s.is_active,
                    "context_percent": round1(s.context_percent),
                    "permission_mode": s.permission_mode,
                    "active_tool": active_tool,
                })
            })
            .collect();

        json!({
            "status": "running",
            "is_idle": self.is_idle_at(now),
            "session_count": sessions.len(),
            "sessions": sessions,
        })
    }

    /// The session the tray should describe
    pub fn current_session(&self) -> Option<&SessionState> {
        if let Some(session) = self
            .active_session_id
            .as_ref()
            .and_then(|id| self.sessions.get(id))
        {
            return Some(session);
        }

        self.sessions
            .values()
            .filter(|s| s.is_active || s.active_tool.is_some())
            .max_by_key(|s| s.last_activity)
    }

    /// Sessions worth showing, most recent first
    pub fn display_sessions(&self, now: Instant) -> Vec<&SessionState> {
        let mut display: Vec<&SessionState> = self
            .sessions
            .values()
            .filter(|s| {
                s.is_active || s.active_tool.is_some() || self.pinned_paths.contains(&s.project_path)
            })
            .filter(|s| !s.is_stale_at(self.activity_timeout, now))
            .collect();
        display.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        display
    }

    /// Drop sessions that are stale, inactive and not pinned
    ///
    /// Returns the removed session ids.
    pub fn cleanup_stale_sessions(&mut self, now: Instant) -> Vec<String> {
        use tracing::debug;

        let timeout = self.activity_timeout;
        let removed: Vec<String> = self
            .sessions
            .values()
            .filter(|s| {
                s.is_stale_at(timeout, now)
                    && !s.is_active
                    && !self.pinned_paths.contains(&s.project_path)
            })
            .map(|s| s.session_id.clone())
            .collect();

        for session_id in &removed {
            debug!("Removing stale session: {}", session_id);
            self.sessions.remove(session_id);
            if self.active_session_id.as_deref() == Some(session_id.as_str()) {
                self.active_session_id = None;
            }
        }

        removed
    }

    /// Whether any session is working
    pub fn has_activity(&self) -> bool {
        self.sessions
            .values()
            .any(|s| s.is_active || s.active_tool.is_some())
    }

    /// Whether no hook event arrived within the idle timeout
    pub fn is_idle_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity_time) > self.idle_timeout
    }

    fn emit(&self, event: StateEvent) {
        // Nobody listening is fine; tests often drop the receiver
        let _ = self.events.send(event);
    }
}

/// Whether a Bash result indicates failure
///
/// A non-zero `exitCode` decides. Without one, stderr is matched against known
/// failure messages. Plain string results are never treated as errors.
pub fn is_bash_error(result: Option<&Value>) -> bool {
    let Some(Value::Object(result)) = result else {
        return false;
    };

    if let Some(code) = result.get("exitCode").filter(|c| !c.is_null()) {
        let is_zero = code.as_i64() == Some(0) || code.as_f64() == Some(0.0);
        if !is_zero {
            return true;
        }
    }

    result
        .get("stderr")
        .and_then(Value::as_str)
        .is_some_and(|stderr| STDERR_ERROR_PATTERNS.iter().any(|p| stderr.contains(p)))
}

/// Text of a Notification event
fn notification_text(tool_input: Option<&Value>) -> String {
    fn pick(v: Option<&Value>) -> Option<&str> {
        v.and_then(Value::as_str).filter(|s| !s.is_empty())
    }
    match tool_input {
        Some(Value::Object(map)) => pick(map.get("message"))
            .or_else(|| pick(map.get("title")))
            .unwrap_or_default()
            .to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) if !is_falsy(other) => other.to_string(),
        _ => String::new(),
    }
}

/// Null, `false`, zero and empty arrays carry no notification text
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(true) => false,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
