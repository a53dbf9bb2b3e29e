//! What the tray icon should show
//!
//! [`TrayTarget`] is derived from session state and decides which pattern the activity
//! indicator runs. [`TrayModel`] is the rendered snapshot handed to the GUI thread; it is
//! compared against the previous one so the icon is only rebuilt on change.

use crate::config::{NotchConfig, Theme, UserSettings};
use crate::session::StateManager;
use crate::view::activity::{ActivityIndicator, LitSquares};
use crate::view::overlay_model::SessionCard;
use std::time::{Duration, Instant};

/// How long the tray stays red after an error
pub const ERROR_FLASH_DURATION: Duration = Duration::from_millis(1500);

/// Tooltip shown while nothing is running
pub const IDLE_TOOLTIP: &str = "Claude Code - Idle";

const FLASH_COLOR: &str = "red";

/// Context usage bar along the bottom of the icon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextBar {
    /// Filled share of the bar, 0.0 to 1.0
    pub fraction: f32,
    /// Fill color
    pub color: [u8; 3],
}

/// Icon decorations that do not affect the animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconStyle {
    /// Backdrop and letter colors
    pub theme: Theme,
    /// Backdrop alpha, 0 for none
    pub background_opacity: u8,
    /// Context usage of the current session
    pub context_bar: Option<ContextBar>,
    /// Project accent stripe
    pub accent: Option<[u8; 3]>,
}

impl IconStyle {
    /// Theme and backdrop from settings, no session decorations
    pub fn from_settings(settings: &UserSettings) -> Self {
        Self {
            theme: settings.theme,
            background_opacity: settings.background_opacity,
            ..Self::default()
        }
    }
}

impl Default for IconStyle {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            background_opacity: 0,
            context_bar: None,
            accent: None,
        }
    }
}

/// Appearance derived from the current session
#[derive(Debug, Clone, PartialEq)]
pub struct TrayTarget {
    /// Color of lit squares
    pub color: [u8; 3],
    /// Pattern name from the design config
    pub pattern: String,
    /// Attention level name from the design config
    pub attention: String,
    /// Speed multiplier from the tool's running time
    pub duration_mult: f64,
    /// Category letter drawn over the grid
    pub letter: Option<char>,
    /// Hover text
    pub tooltip: String,
    /// Backdrop, context bar and accent
    pub style: IconStyle,
}

impl TrayTarget {
    /// Appearance for the session the tray describes at `now`
    pub fn from_state(state: &StateManager, settings: &UserSettings, now: Instant) -> Self {
        let config = state.config();
        let Some((session, tool)) = state
            .current_session()
            .and_then(|s| s.active_tool.as_ref().map(|t| (s, t)))
        else {
            return Self {
                style: IconStyle::from_settings(settings),
                ..Self::idle(config)
            };
        };

        let letter = if settings.show_category_letter {
            category_letter(&tool.category)
        } else {
            None
        };

        let mut tooltip = format!("Claude Code - {}", tool.display_name);
        if !session.project_name.is_empty() {
            tooltip.push('\n');
            tooltip.push_str(&session.project_name);
        }
        if session.context_percent > 0.0 {
            tooltip.push_str(&format!("\nContext: {:.1}%", session.context_percent));
        }

        let (_, duration_mult) =
            config.get_duration_speed_mult(tool.elapsed_at(now).as_secs_f64());

        Self {
            color: config.get_color_rgb(&tool.color),
            pattern: tool.pattern.clone(),
            attention: tool.attention.clone(),
            duration_mult,
            letter,
            tooltip,
            style: IconStyle::from_settings(settings),
        }
    }

    /// Appearance while no tool is running
    pub fn idle(config: &NotchConfig) -> Self {
        let (color, pattern, attention) = config.idle_appearance();
        Self {
            color: config.get_color_rgb(&color),
            pattern,
            attention,
            duration_mult: 1.0,
            letter: None,
            tooltip: IDLE_TOOLTIP.to_string(),
            style: IconStyle::default(),
        }
    }

    /// Show the context bar and project accent of `card`
    pub fn decorate(&mut self, card: &SessionCard) {
        #[expect(clippy::cast_possible_truncation, reason = "percent is at most 100")]
        let fraction = (card.context_percent / 100.0).clamp(0.0, 1.0) as f32;
        self.style.context_bar = (card.context_percent > 0.0).then_some(ContextBar {
            fraction,
            color: card.context_color,
        });
        self.style.accent = card.project_color;
    }

    /// Whether switching to `other` needs the indicator reconfigured
    pub fn animation_differs(&self, other: &Self) -> bool {
        self.color != other.color
            || self.pattern != other.pattern
            || self.attention != other.attention
            || (self.duration_mult - other.duration_mult).abs() > f64::EPSILON
    }

    /// Point `indicator` at this target's pattern
    pub fn configure(
        &self,
        indicator: &mut ActivityIndicator,
        config: &NotchConfig,
        settings: &UserSettings,
        now: Instant,
    ) {
        indicator.configure(
            config.get_pattern(&self.pattern),
            self.color,
            &config.get_attention(&self.attention),
            settings.animation_speed_multiplier * self.duration_mult,
            settings.animations_enabled,
            now,
        );
    }
}

/// Red flash window after an error
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFlash {
    until: Option<Instant>,
}

impl ErrorFlash {
    /// Start (or extend) the flash at `now`
    pub fn trigger(&mut self, now: Instant) {
        self.until = Some(now + ERROR_FLASH_DURATION);
    }

    /// Whether the tray should be red at `now`
    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }
}

/// Snapshot drawn by the tray icon
#[derive(Debug, Clone, PartialEq)]
pub struct TrayModel {
    /// Color of lit squares
    pub color: [u8; 3],
    /// Lit square indices
    pub lit_squares: LitSquares,
    /// Opacity of lit squares
    pub opacity: f32,
    /// Category letter
    pub letter: Option<char>,
    /// Hover text
    pub tooltip: String,
    /// Whether the error flash is showing
    pub flashing: bool,
    /// Backdrop, context bar and accent
    pub style: IconStyle,
}

impl TrayModel {
    /// Compose the target with the indicator's current frame
    pub fn compose(
        target: &TrayTarget,
        indicator: &ActivityIndicator,
        config: &NotchConfig,
        flashing: bool,
    ) -> Self {
        let color = if flashing {
            config.get_color_rgb(FLASH_COLOR)
        } else {
            indicator.color()
        };
        Self {
            color,
            lit_squares: indicator.lit_squares().iter().copied().collect(),
            opacity: indicator.opacity(),
            letter: target.letter,
            tooltip: target.tooltip.clone(),
            flashing,
            style: target.style,
        }
    }
}

fn category_letter(category: &str) -> Option<char> {
    category.chars().next().map(|c| c.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{hook_message as hook, state_manager as manager};
    use serde_json::json;

    #[test]
    fn test_idle_target() {
        let (sm, _rx) = manager();
        let target = TrayTarget::from_state(&sm, &UserSettings::default(), Instant::now());
        assert_eq!(target.tooltip, IDLE_TOOLTIP);
        assert_eq!(target.pattern, "dormant");
        assert_eq!(target.attention, "peripheral");
        assert_eq!(target.color, [100, 116, 139]);
        assert_eq!(target.letter, None);
    }

    #[test]
    fn test_active_target() {
        let (mut sm, _rx) = manager();
        let now = Instant::now();
        sm.handle_message_at(
            hook(json!({"eventType": "PreToolUse", "sessionId": "s1", "cwd": "C:\\code\\api", "tool": "Bash"})),
            now,
        );

        let target = TrayTarget::from_state(&sm, &UserSettings::default(), now);
        assert_eq!(target.color, [245, 158, 11]);
        assert_eq!(target.pattern, "execute");
        assert_eq!(target.letter, Some('E'));
        assert_eq!(target.tooltip, "Claude Code - Running\napi");

        let settings = UserSettings {
            show_category_letter: false,
            ..UserSettings::default()
        };
        assert_eq!(TrayTarget::from_state(&sm, &settings, now).letter, None);
    }

    #[test]
    fn test_tooltip_includes_context() {
        let (mut sm, _rx) = manager();
        let now = Instant::now();
        sm.handle_message_at(
            hook(json!({"eventType": "PreToolUse", "sessionId": "s1", "cwd": "/w/api", "tool": "Read"})),
            now,
        );
        sm.apply_token_update(
            "s1",
            crate::session::TokenStats {
                input_tokens: 50_000,
                ..Default::default()
            },
        );

        let target = TrayTarget::from_state(&sm, &UserSettings::default(), now);
        assert_eq!(target.tooltip, "Claude Code - Reading\napi\nContext: 25.0%");
    }

    #[test]
    fn test_style_follows_settings_and_card() {
        let (mut sm, _rx) = manager();
        let now = Instant::now();
        sm.handle_message_at(
            hook(json!({"eventType": "PreToolUse", "sessionId": "s1", "cwd": "/w/api", "tool": "Read"})),
            now,
        );
        sm.apply_token_update(
            "s1",
            crate::session::TokenStats {
                input_tokens: 170_000,
                ..Default::default()
            },
        );

        let mut settings = UserSettings {
            theme: Theme::Light,
            background_opacity: 128,
            ..UserSettings::default()
        };
        settings.project_colors.insert("api".into(), "purple".into());

        let mut target = TrayTarget::from_state(&sm, &settings, now);
        assert_eq!(target.style.theme, Theme::Light);
        assert_eq!(target.style.background_opacity, 128);
        assert_eq!(target.style.context_bar, None);

        let overlay = crate::view::OverlayModel::build(&sm, &settings, now);
        target.decorate(overlay.card("s1").unwrap());
        let bar = target.style.context_bar.unwrap();
        assert!((bar.fraction - 0.85).abs() < 1e-6);
        assert_eq!(bar.color, crate::view::overlay_model::CONTEXT_COLOR_HIGH);
        assert_eq!(target.style.accent, Some(sm.config().get_color_rgb("purple")));
        // Decorations never restart the animation
        assert!(!target.animation_differs(&TrayTarget::from_state(&sm, &settings, now)));

        let idle = TrayTarget::from_state(&manager().0, &settings, now);
        assert_eq!(idle.style, IconStyle::from_settings(&settings));
    }

    #[test]
    fn test_long_running_tool_slows_down() {
        let (mut sm, _rx) = manager();
        let start = Instant::now();
        sm.handle_message_at(
            hook(json!({"eventType": "PreToolUse", "sessionId": "s1", "tool": "Bash"})),
            start,
        );

        let fresh = TrayTarget::from_state(&sm, &UserSettings::default(), start);
        let later = TrayTarget::from_state(&sm, &UserSettings::default(), start + Duration::from_secs(40));
        assert!((fresh.duration_mult - 1.0).abs() < f64::EPSILON);
        assert!((later.duration_mult - 0.5).abs() < f64::EPSILON);
        assert!(fresh.animation_differs(&later));
    }

    #[test]
    fn test_error_flash_window() {
        let mut flash = ErrorFlash::default();
        let now = Instant::now();
        assert!(!flash.is_active(now));
        flash.trigger(now);
        assert!(flash.is_active(now + Duration::from_millis(1000)));
        assert!(!flash.is_active(now + ERROR_FLASH_DURATION));
    }

    #[test]
    fn test_compose_uses_flash_color() {
        let config = NotchConfig::embedded();
        let now = Instant::now();
        let target = TrayTarget::idle(&config);
        let mut indicator = ActivityIndicator::new(now);
        target.configure(&mut indicator, &config, &UserSettings::default(), now);

        let normal = TrayModel::compose(&target, &indicator, &config, false);
        assert_eq!(normal.color, [100, 116, 139]);
        assert_eq!(normal.lit_squares.as_slice(), &[1, 4]);

        let flashing = TrayModel::compose(&target, &indicator, &config, true);
        assert_eq!(flashing.color, [239, 68, 68]);
        assert_ne!(normal, flashing);
    }
}
