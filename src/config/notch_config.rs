//! Design configuration (categories, tools, colors, patterns)
//!
//! The visual vocabulary lives in `config/notch-config.json`, embedded at build time.
//! A copy placed next to settings.json overrides the embedded one, which lets users
//! restyle tools without rebuilding.

use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const EMBEDDED_CONFIG: &str = include_str!("../../config/notch-config.json");

/// Fallback RGB when neither the requested color nor orange is defined
pub const FALLBACK_RGB: [u8; 3] = [249, 115, 22];

/// Per-category appearance
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Color name
    pub color: Option<String>,
    /// Animation pattern name
    pub pattern: Option<String>,
    /// Relative intensity (1-3)
    pub intensity: Option<u8>,
    /// Attention level name
    pub attention: Option<String>,
    /// Human-readable description
    pub description: Option<String>,
}

/// Per-tool mapping onto a category
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Category name
    pub category: Option<String>,
    /// Label shown while the tool runs
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

/// Synthetic "thinking" state shown between tool calls
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThinkingState {
    /// Category borrowed for color, pattern and attention
    pub category: Option<String>,
    /// Labels picked at random for the grace period
    #[serde(rename = "funVerbs")]
    pub fun_verbs: Vec<String>,
}

/// Appearance while no tool is running
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdleState {
    /// Color name
    pub color: Option<String>,
    /// Pattern name
    pub pattern: Option<String>,
    /// Attention level name
    pub attention: Option<String>,
}

/// Named states
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatesConfig {
    /// Grace period state
    pub thinking: ThinkingState,
    /// Idle state
    pub idle: IdleState,
}

/// How a pattern picks lit squares on each step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    /// Cycle through `sequence`
    Sequence,
    /// Light a random number of squares within `litRange`
    Random,
    /// All squares lit, opacity follows a sine wave
    Breathe,
    /// First frame of `sequence`, never changes
    #[default]
    Static,
}

/// Animation pattern over the 3x2 square grid (indices 0-5, row major)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Step mode
    pub mode: PatternMode,
    /// Seconds between steps
    pub interval: f64,
    /// Frames of lit square indices
    pub sequence: Vec<Vec<u8>>,
    /// Inclusive range of squares lit in random mode
    #[serde(rename = "litRange")]
    pub lit_range: Option<[u8; 2]>,
}

/// Named RGB color
#[derive(Debug, Clone, Deserialize)]
pub struct ColorConfig {
    /// Red, green, blue
    pub rgb: [u8; 3],
}

/// Opacity range and pulse flag for an attention level
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Minimum and maximum opacity
    pub opacity: [f32; 2],
    /// Whether the indicator should pulse
    pub pulse: bool,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            opacity: [0.6, 0.85],
            pulse: false,
        }
    }
}

impl AttentionConfig {
    /// Fixed opacity used for drawing: the midpoint of the range
    pub fn midpoint(&self) -> f32 {
        f32::midpoint(self.opacity[0], self.opacity[1])
    }
}

/// One step of the duration ladder
#[derive(Debug, Clone, Deserialize)]
pub struct DurationLevel {
    /// Upper bound in seconds, absent for the last level
    pub until: Option<f64>,
    /// Animation speed factor while in this level
    #[serde(rename = "speedMult", default = "default_speed_mult")]
    pub speed_mult: f64,
}

fn default_speed_mult() -> f64 {
    1.0
}

/// Animation slowdown as a tool keeps running
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DurationEvolution {
    /// Fresh tool call
    pub normal: Option<DurationLevel>,
    /// Running for a while
    pub extended: Option<DurationLevel>,
    /// Running long
    pub long: Option<DurationLevel>,
    /// Probably stuck
    pub stuck: Option<DurationLevel>,
}

/// Duration tier of a running tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationTier {
    /// Fresh tool call
    Normal,
    /// Running for a while
    Extended,
    /// Running long
    Long,
    /// Probably stuck
    Stuck,
}

impl DurationTier {
    /// Tier name as used in the config
    pub fn as_str(self) -> &'static str {
        match self {
            DurationTier::Normal => "normal",
            DurationTier::Extended => "extended",
            DurationTier::Long => "long",
            DurationTier::Stuck => "stuck",
        }
    }
}

/// Timing defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Seconds the thinking state lingers after a tool finishes
    #[serde(rename = "gracePeriod")]
    pub grace_period: f64,
    /// Seconds before a session is stale
    #[serde(rename = "activityTimeout")]
    pub activity_timeout: u64,
    /// Seconds before the app counts as idle
    #[serde(rename = "idleTimeout")]
    pub idle_timeout: u64,
    /// Mapping for tools missing from `tools`
    #[serde(rename = "unknownTool")]
    pub unknown_tool: ToolConfig,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            grace_period: 3.0,
            activity_timeout: 60,
            idle_timeout: 15,
            unknown_tool: ToolConfig::default(),
        }
    }
}

/// Tool lookup merged with its category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    /// Tool name as reported by the hook
    pub tool_name: String,
    /// Label shown while running
    pub display_name: String,
    /// Category name
    pub category: String,
    /// Color name
    pub color: String,
    /// Pattern name
    pub pattern: String,
    /// Intensity (1-3)
    pub intensity: u8,
    /// Attention level name
    pub attention: String,
    /// Category description
    pub description: String,
}

/// Parsed design configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotchConfig {
    /// Categories by name
    pub categories: HashMap<String, CategoryConfig>,
    /// Tools by lowercase name
    pub tools: HashMap<String, ToolConfig>,
    /// Named states
    pub states: StatesConfig,
    /// Patterns by name
    pub patterns: HashMap<String, PatternConfig>,
    /// Colors by name
    pub colors: HashMap<String, ColorConfig>,
    /// Attention levels by name
    pub attention_levels: HashMap<String, AttentionConfig>,
    /// Duration ladder
    pub duration_evolution: DurationEvolution,
    /// Timing defaults
    pub defaults: DefaultsConfig,
}

impl NotchConfig {
    /// Parse a configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The configuration shipped with the binary
    pub fn embedded() -> Self {
        Self::from_json_str(EMBEDDED_CONFIG).unwrap_or_else(|e| {
            warn!("Embedded notch-config.json is invalid, using built-in fallbacks: {e}");
            Self::default()
        })
    }

    /// Load the override in `dir` if present and valid, otherwise the embedded config
    pub fn load(dir: &Path) -> Self {
        let path = dir.join("notch-config.json");
        if !path.exists() {
            return Self::embedded();
        }

        match std::fs::read_to_string(&path)
            .map_err(crate::error::NotchError::from)
            .and_then(|json| Self::from_json_str(&json))
        {
            Ok(config) => {
                info!("Loaded design config override from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring invalid {}: {}", path.display(), e);
                Self::embedded()
            }
        }
    }

    /// Look up a tool (case-insensitive) and merge in its category
    pub fn get_tool_info(&self, tool_name: &str) -> ToolInfo {
        let tool = self
            .tools
            .get(&tool_name.to_lowercase())
            .unwrap_or(&self.defaults.unknown_tool);

        let category_name = tool.category.clone().unwrap_or_else(|| "think".to_string());
        let category = self.categories.get(&category_name);
        let field = |f: fn(&CategoryConfig) -> Option<&String>, fallback: &str| {
            category
                .and_then(f)
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };

        ToolInfo {
            tool_name: tool_name.to_string(),
            display_name: tool
                .display_name
                .clone()
                .unwrap_or_else(|| title_case(tool_name)),
            color: field(|c| c.color.as_ref(), "orange"),
            pattern: field(|c| c.pattern.as_ref(), "cogitate"),
            intensity: category.and_then(|c| c.intensity).unwrap_or(2),
            attention: field(|c| c.attention.as_ref(), "ambient"),
            description: field(|c| c.description.as_ref(), ""),
            category: category_name,
        }
    }

    /// Category config by name
    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.get(name)
    }

    /// RGB for a color name, falling back to orange
    pub fn get_color_rgb(&self, color_name: &str) -> [u8; 3] {
        self.colors
            .get(color_name)
            .or_else(|| self.colors.get("orange"))
            .map_or(FALLBACK_RGB, |c| c.rgb)
    }

    /// Whether a color name is defined
    pub fn has_color(&self, color_name: &str) -> bool {
        self.colors.contains_key(color_name)
    }

    /// Pattern by name, falling back to `cogitate`, then to a static blank pattern
    pub fn get_pattern(&self, pattern_name: &str) -> PatternConfig {
        self.patterns
            .get(pattern_name)
            .or_else(|| self.patterns.get("cogitate"))
            .cloned()
            .unwrap_or_default()
    }

    /// Attention config by level name, falling back to `ambient`
    pub fn get_attention(&self, level: &str) -> AttentionConfig {
        self.attention_levels
            .get(level)
            .or_else(|| self.attention_levels.get("ambient"))
            .copied()
            .unwrap_or_default()
    }

    /// Duration tier and speed multiplier for a tool running `elapsed_secs`
    pub fn get_duration_speed_mult(&self, elapsed_secs: f64) -> (DurationTier, f64) {
        let evolution = &self.duration_evolution;
        let levels = [
            (DurationTier::Normal, &evolution.normal),
            (DurationTier::Extended, &evolution.extended),
            (DurationTier::Long, &evolution.long),
            (DurationTier::Stuck, &evolution.stuck),
        ];

        for (tier, level) in levels {
            let (until, mult) = level
                .as_ref()
                .map_or((None, 1.0), |l| (l.until, l.speed_mult));
            if until.is_none_or(|until| elapsed_secs < until) {
                return (tier, mult);
            }
        }

        (DurationTier::Stuck, 0.3)
    }

    /// Grace period after a tool finishes
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs_f64(self.defaults.grace_period.max(0.0))
    }

    /// Labels for the thinking state (never empty)
    pub fn fun_verbs(&self) -> Vec<String> {
        let verbs = &self.states.thinking.fun_verbs;
        if verbs.is_empty() {
            vec!["Thinking".to_string()]
        } else {
            verbs.clone()
        }
    }

    /// Category used by the thinking state
    pub fn thinking_category(&self) -> String {
        self.states
            .thinking
            .category
            .clone()
            .unwrap_or_else(|| "think".to_string())
    }

    /// Color, pattern and attention used while idle
    pub fn idle_appearance(&self) -> (String, String, String) {
        let idle = &self.states.idle;
        (
            idle.color.clone().unwrap_or_else(|| "slate".to_string()),
            idle.pattern.clone().unwrap_or_else(|| "dormant".to_string()),
            idle.attention.clone().unwrap_or_else(|| "peripheral".to_string()),
        )
    }
}

/// Capitalize the first letter of each alphabetic run and lowercase the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_loads() {
        let config = NotchConfig::embedded();
        assert!(!config.categories.is_empty());
        assert!(!config.tools.is_empty());
        assert!(!config.patterns.is_empty());
        assert!(!config.colors.is_empty());
    }

    #[test]
    fn test_known_tool_info() {
        let config = NotchConfig::embedded();
        let info = config.get_tool_info("Read");
        assert_eq!(info.tool_name, "Read");
        assert_eq!(info.category, "observe");
        assert!(!info.color.is_empty());
        assert!(!info.pattern.is_empty());
        assert!(!info.attention.is_empty());
    }

    #[test]
    fn test_tool_lookup_is_case_insensitive() {
        let config = NotchConfig::embedded();
        assert_eq!(config.get_tool_info("BASH").category, "execute");
        assert_eq!(config.get_tool_info("bash").display_name, "Running");
    }

    #[test]
    fn test_unknown_tool_uses_defaults() {
        let config = NotchConfig::embedded();
        let info = config.get_tool_info("NonExistentTool");
        assert_eq!(info.tool_name, "NonExistentTool");
        assert_eq!(info.category, "think");
        assert_eq!(info.display_name, "Nonexistenttool");
    }

    #[test]
    fn test_empty_config_fallbacks() {
        let config = NotchConfig::default();
        let info = config.get_tool_info("mcp__server__tool");
        assert_eq!(info.category, "think");
        assert_eq!(info.color, "orange");
        assert_eq!(info.pattern, "cogitate");
        assert_eq!(info.attention, "ambient");
        assert_eq!(info.intensity, 2);
        assert_eq!(info.display_name, "Mcp__Server__Tool");
        assert_eq!(config.get_color_rgb("anything"), FALLBACK_RGB);
        assert_eq!(config.get_pattern("anything").mode, PatternMode::Static);
        assert_eq!(config.get_attention("anything"), AttentionConfig::default());
    }

    #[test]
    fn test_color_rgb() {
        let config = NotchConfig::embedded();
        assert_eq!(config.get_color_rgb("orange"), [249, 115, 22]);
        assert_eq!(config.get_color_rgb("no-such-color"), [249, 115, 22]);
        assert_eq!(config.get_color_rgb("slate"), [100, 116, 139]);
    }

    #[test]
    fn test_pattern_lookup() {
        let config = NotchConfig::embedded();
        assert_eq!(config.get_pattern("scan").mode, PatternMode::Sequence);
        assert_eq!(config.get_pattern("missing").mode, PatternMode::Random);
    }

    #[test]
    fn test_attention_lookup() {
        let config = NotchConfig::embedded();
        assert!(config.get_attention("urgent").pulse);
        let fallback = config.get_attention("missing");
        assert_eq!(fallback, config.get_attention("ambient"));
        assert!((fallback.midpoint() - 0.725).abs() < 1e-6);
    }

    #[test]
    fn test_duration_tiers() {
        let config = NotchConfig::embedded();

        let (tier, mult) = config.get_duration_speed_mult(0.0);
        assert_eq!(tier, DurationTier::Normal);
        assert!((mult - 1.0).abs() < f64::EPSILON);

        let (tier, mult) = config.get_duration_speed_mult(10.0);
        assert_eq!(tier, DurationTier::Extended);
        assert!(mult < 1.0);

        let (tier, mult) = config.get_duration_speed_mult(999.0);
        assert_eq!(tier, DurationTier::Stuck);
        assert!(mult <= 0.3);
    }

    #[test]
    fn test_duration_without_evolution_section() {
        let config = NotchConfig::default();
        assert_eq!(
            config.get_duration_speed_mult(5000.0),
            (DurationTier::Normal, 1.0)
        );
    }

    #[test]
    fn test_thinking_state() {
        let config = NotchConfig::embedded();
        assert_eq!(config.thinking_category(), "think");
        assert!(config.fun_verbs().contains(&"Thinking".to_string()));
        assert_eq!(config.grace_period(), Duration::from_secs(3));
        assert_eq!(NotchConfig::default().fun_verbs(), vec!["Thinking".to_string()]);
    }

    #[test]
    fn test_load_prefers_valid_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("notch-config.json"),
            r#"{"tools": {"read": {"category": "custom", "displayName": "Peeking"}}}"#,
        )
        .unwrap();

        let config = NotchConfig::load(dir.path());
        assert_eq!(config.get_tool_info("Read").display_name, "Peeking");
    }

    #[test]
    fn test_load_ignores_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notch-config.json"), "[broken").unwrap();

        let config = NotchConfig::load(dir.path());
        assert_eq!(config.get_tool_info("Read").category, "observe");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("someTool"), "Sometool");
        assert_eq!(title_case("web fetch"), "Web Fetch");
        assert_eq!(title_case(""), "");
    }
}
