//! Session data structures
//!
//! A session is one Claude Code run, keyed by the opaque session id the hook reports.

use crate::config::ToolInfo;
use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};

/// Maximum number of entries kept in [`SessionState::recent_tools`]
pub const MAX_RECENT_TOOLS: usize = 10;

/// Pseudo tool name used while Claude is thinking between tool calls
pub const THINKING_TOOL: &str = "_thinking";

/// The tool a session is currently running
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTool {
    /// Tool name as reported by the hook
    pub tool_name: String,
    /// Label shown in the tray and overlay
    pub display_name: String,
    /// Category name
    pub category: String,
    /// Color name
    pub color: String,
    /// Animation pattern name
    pub pattern: String,
    /// Attention level name
    pub attention: String,
    /// Category description
    pub description: String,
    /// When the tool started
    pub started_at: Instant,
}

impl ActiveTool {
    /// Create a tool with the default "working" appearance
    pub fn new(tool_name: impl Into<String>, started_at: Instant) -> Self {
        Self {
            tool_name: tool_name.into(),
            display_name: "Working".to_string(),
            category: "think".to_string(),
            color: "orange".to_string(),
            pattern: "cogitate".to_string(),
            attention: "ambient".to_string(),
            description: String::new(),
            started_at,
        }
    }

    /// Build from a design config lookup
    pub fn from_tool_info(info: ToolInfo, started_at: Instant) -> Self {
        Self {
            tool_name: info.tool_name,
            display_name: info.display_name,
            category: info.category,
            color: info.color,
            pattern: info.pattern,
            attention: info.attention,
            description: info.description,
            started_at,
        }
    }

    /// Time since the tool started
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Whether this is the synthetic thinking tool
    pub fn is_thinking(&self) -> bool {
        self.tool_name == THINKING_TOOL
    }
}

/// Token usage as last reported by the transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenStats {
    /// Input tokens
    pub input_tokens: u64,
    /// Output tokens
    pub output_tokens: u64,
    /// Tokens written to the prompt cache
    pub cache_creation_tokens: u64,
    /// Tokens read from the prompt cache
    pub cache_read_tokens: u64,
}

impl TokenStats {
    /// Input plus output
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Tokens that are billed at full or cache-write rate
    pub fn total_cost_tokens(&self) -> u64 {
        self.total_tokens() + self.cache_creation_tokens
    }
}

/// State of one tracked session
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Session id from the hook
    pub session_id: String,
    /// Working directory of the session
    pub project_path: String,
    /// Final component of the project path
    pub project_name: String,
    /// Session start (reset on `SessionStart`)
    pub start_time: Instant,
    /// Last hook event for this session
    pub last_activity: Instant,
    /// Tool currently running, if any
    pub active_tool: Option<ActiveTool>,
    /// Recently started tools, newest first
    pub recent_tools: VecDeque<ActiveTool>,
    /// Whether Claude is working on a prompt
    pub is_active: bool,
    /// Permission mode reported by the hook
    pub permission_mode: String,
    /// Last known token usage
    pub token_stats: TokenStats,
    /// Context window usage in percent (0-100)
    pub context_percent: f64,
    /// Tokens in the context window
    pub context_tokens: u64,
    /// Terminal window hosting the session (HWND as integer)
    pub terminal_window: Option<isize>,
    /// Last time the transcript was read for token usage
    pub last_token_read: Option<Instant>,
    /// When the thinking grace period ends
    pub grace_deadline: Option<Instant>,
}

impl SessionState {
    /// Create a session for `project_path`, starting now
    pub fn new(session_id: impl Into<String>, project_path: impl Into<String>, now: Instant) -> Self {
        let project_path = project_path.into();
        let project_name = path_basename(&project_path).unwrap_or_default();
        Self {
            session_id: session_id.into(),
            project_path,
            project_name,
            start_time: now,
            last_activity: now,
            active_tool: None,
            recent_tools: VecDeque::with_capacity(MAX_RECENT_TOOLS),
            is_active: true,
            permission_mode: "normal".to_string(),
            token_stats: TokenStats::default(),
            context_percent: 0.0,
            context_tokens: 0,
            terminal_window: None,
            last_token_read: None,
            grace_deadline: None,
        }
    }

    /// Name shown for the session
    pub fn display_name(&self) -> String {
        if !self.project_name.is_empty() {
            return self.project_name.clone();
        }
        path_basename(&self.project_path).unwrap_or_else(|| "Unknown".to_string())
    }

    /// One-line status, e.g. "Reading - my-project"
    pub fn status_text(&self) -> String {
        match &self.active_tool {
            Some(tool) => format!("{} - {}", tool.display_name, self.display_name()),
            None => format!("Idle - {}", self.display_name()),
        }
    }

    /// Whether no event arrived within `timeout` before `now`
    pub fn is_stale_at(&self, timeout: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) > timeout
    }

    /// Record a started tool, keeping at most [`MAX_RECENT_TOOLS`]
    pub fn push_recent_tool(&mut self, tool: ActiveTool) {
        self.recent_tools.push_front(tool);
        self.recent_tools.truncate(MAX_RECENT_TOOLS);
    }
}

/// Final path component, accepting both separators
pub fn path_basename(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches(['/', '\\']);
    let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    if name.is_empty() {
        return Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
    }
    Some(name.to_string())
}
