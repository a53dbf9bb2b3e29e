//! Session card view models
//!
//! One card per displayed session with its status line, context usage, project color
//! and a strip of recent tool categories. With several sessions the cards become the
//! tray tooltip; the current session's card also decorates the tray icon.

use crate::config::{NotchConfig, UserSettings};
use crate::session::{ActiveTool, SessionState, StateManager};
use std::time::Instant;

/// Timeline strip holds at most this many tools
pub const MAX_TIMELINE_WEIGHT: usize = 10;

/// Context bar color at 80% and above (#EF4444)
pub const CONTEXT_COLOR_HIGH: [u8; 3] = [0xEF, 0x44, 0x44];
/// Context bar color at 50% and above (#F59E0B)
pub const CONTEXT_COLOR_MEDIUM: [u8; 3] = [0xF5, 0x9E, 0x0B];
/// Context bar color below 50% (#22C55E)
pub const CONTEXT_COLOR_LOW: [u8; 3] = [0x22, 0xC5, 0x5E];

/// Longest tooltip the Windows shell displays
const MAX_TOOLTIP_CHARS: usize = 127;

/// Card layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMode {
    /// Project, status, context bar and timeline
    Full,
    /// Project and status only
    Mini,
}

/// Run of consecutive tools in one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSegment {
    /// Category shared by the run
    pub category: String,
    /// Color of the run's first tool
    pub color: [u8; 3],
    /// Number of tools in the run
    pub weight: usize,
}

impl TimelineSegment {
    /// The run as repeated category initials, e.g. "OOE" for two observe tools then one execute
    pub fn initials(&self) -> String {
        self.category
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase().to_string().repeat(self.weight))
            .unwrap_or_default()
    }
}

/// One session card
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCard {
    /// Session id
    pub session_id: String,
    /// Project name shown as the card title
    pub project_name: String,
    /// Tool display name or "Idle", with a permission mode badge
    pub status: String,
    /// "Context: x.x%", empty before the first token reading
    pub context_text: String,
    /// Context usage in percent
    pub context_percent: f64,
    /// Context bar fill color
    pub context_color: [u8; 3],
    /// Accent color configured for the project
    pub project_color: Option<[u8; 3]>,
    /// Recent tools, oldest first
    pub timeline: Vec<TimelineSegment>,
    /// Layout
    pub mode: CardMode,
}

/// Everything the overlay shows
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayModel {
    /// Whether the overlay should be on screen
    pub visible: bool,
    /// Cards, most recent session first
    pub cards: Vec<SessionCard>,
}

impl OverlayModel {
    /// Build the overlay for `now`
    pub fn build(state: &StateManager, settings: &UserSettings, now: Instant) -> Self {
        let config = state.config();
        let mode = if settings.mini_mode {
            CardMode::Mini
        } else {
            CardMode::Full
        };

        let cards: Vec<SessionCard> = state
            .display_sessions(now)
            .into_iter()
            .map(|session| SessionCard::build(session, config, settings, mode))
            .collect();

        Self {
            visible: should_show(!cards.is_empty(), settings.auto_hide, state.is_idle_at(now)),
            cards,
        }
    }

    /// Card of the given session, if it is displayed
    pub fn card(&self, session_id: &str) -> Option<&SessionCard> {
        self.cards.iter().find(|card| card.session_id == session_id)
    }

    /// Multi-line text listing every card
    pub fn tooltip(&self) -> String {
        let mut lines = Vec::with_capacity(self.cards.len() * 2);
        for card in &self.cards {
            lines.push(format!("{}: {}", card.project_name, card.status));
            if card.mode == CardMode::Full {
                let strip: String = card.timeline.iter().map(TimelineSegment::initials).collect();
                let detail = [card.context_text.as_str(), strip.as_str()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join("  ");
                if !detail.is_empty() {
                    lines.push(format!("  {detail}"));
                }
            }
        }
        let text = lines.join("\n");
        if text.chars().count() > MAX_TOOLTIP_CHARS {
            let mut cut: String = text.chars().take(MAX_TOOLTIP_CHARS - 3).collect();
            cut.push_str("...");
            cut
        } else {
            text
        }
    }
}

impl SessionCard {
    /// Card for `session`
    pub fn build(
        session: &SessionState,
        config: &NotchConfig,
        settings: &UserSettings,
        mode: CardMode,
    ) -> Self {
        let project_name = session.display_name();
        let timeline = match mode {
            CardMode::Full => timeline_segments(session.recent_tools.iter().rev(), config),
            CardMode::Mini => Vec::new(),
        };

        Self {
            session_id: session.session_id.clone(),
            project_color: project_color(&project_name, settings, config),
            project_name,
            status: status_text(session),
            context_text: context_text(session.context_percent),
            context_percent: session.context_percent,
            context_color: context_color(session.context_percent),
            timeline,
            mode,
        }
    }
}

/// Tool display name or "Idle", plus `  [mode]` for non-default permission modes
pub fn status_text(session: &SessionState) -> String {
    let mut text = session
        .active_tool
        .as_ref()
        .map_or_else(|| "Idle".to_string(), |tool| tool.display_name.clone());
    let mode = session.permission_mode.as_str();
    if !matches!(mode, "" | "normal" | "default") {
        text.push_str(&format!("  [{mode}]"));
    }
    text
}

/// "Context: x.x%", or empty when nothing has been read yet
pub fn context_text(percent: f64) -> String {
    if percent > 0.0 {
        format!("Context: {percent:.1}%")
    } else {
        String::new()
    }
}

/// Context bar color for a usage percentage
pub fn context_color(percent: f64) -> [u8; 3] {
    if percent >= 80.0 {
        CONTEXT_COLOR_HIGH
    } else if percent >= 50.0 {
        CONTEXT_COLOR_MEDIUM
    } else {
        CONTEXT_COLOR_LOW
    }
}

/// Coalesce tools (oldest first) into category runs, keeping the newest ten tools
pub fn timeline_segments<'a>(
    tools: impl Iterator<Item = &'a ActiveTool>,
    config: &NotchConfig,
) -> Vec<TimelineSegment> {
    let tools: Vec<&ActiveTool> = tools.collect();
    let skip = tools.len().saturating_sub(MAX_TIMELINE_WEIGHT);

    let mut segments: Vec<TimelineSegment> = Vec::new();
    for tool in tools.into_iter().skip(skip) {
        match segments.last_mut() {
            Some(last) if last.category == tool.category => last.weight += 1,
            _ => segments.push(TimelineSegment {
                category: tool.category.clone(),
                color: config.get_color_rgb(&tool.color),
                weight: 1,
            }),
        }
    }
    segments
}

/// Accent color the user assigned to a project, if it names a known color
pub fn project_color(
    project_name: &str,
    settings: &UserSettings,
    config: &NotchConfig,
) -> Option<[u8; 3]> {
    if project_name.is_empty() {
        return None;
    }
    settings
        .project_colors
        .get(project_name)
        .filter(|name| config.has_color(name.as_str()))
        .map(|name| config.get_color_rgb(name))
}

/// Whether the overlay should be visible
pub fn should_show(has_sessions: bool, auto_hide: bool, is_idle: bool) -> bool {
    has_sessions && !(auto_hide && is_idle)
}
