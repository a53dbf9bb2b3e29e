//! Hook request bodies
//!
//! Bodies are camelCase JSON produced by `notch-hook`. Every field is optional so
//! older or hand-written senders still get through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claude Code lifecycle event named by `eventType`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    /// A tool is about to run
    PreToolUse,
    /// A tool finished
    PostToolUse,
    /// Claude finished responding
    Stop,
    /// A subagent finished
    SubagentStop,
    /// A session started or resumed
    SessionStart,
    /// A session ended
    SessionEnd,
    /// Claude Code wants the user's attention
    Notification,
    /// The user submitted a prompt
    UserPromptSubmit,
    /// Anything else, ignored by the state machine
    Other(String),
}

impl HookEvent {
    /// Parse an event name
    pub fn parse(name: &str) -> Self {
        match name {
            "PreToolUse" => Self::PreToolUse,
            "PostToolUse" => Self::PostToolUse,
            "Stop" => Self::Stop,
            "SubagentStop" => Self::SubagentStop,
            "SessionStart" => Self::SessionStart,
            "SessionEnd" => Self::SessionEnd,
            "Notification" => Self::Notification,
            "UserPromptSubmit" => Self::UserPromptSubmit,
            other => Self::Other(other.to_string()),
        }
    }

    /// Event name as sent on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::Stop => "Stop",
            Self::SubagentStop => "SubagentStop",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::Notification => "Notification",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::Other(name) => name,
        }
    }
}

/// Body of `POST /hook`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookPayload {
    /// Lifecycle event name
    pub event_type: Option<String>,
    /// Session id
    pub session_id: Option<String>,
    /// Working directory of the session
    pub cwd: Option<String>,
    /// Pid of the Claude Code process
    pub pid: Option<u32>,
    /// Tool name for tool events
    pub tool: Option<String>,
    /// Tool input, or the notification body
    pub tool_input: Option<Value>,
    /// Tool result for `PostToolUse`
    pub tool_result: Option<Value>,
    /// Tool result as sent by the hook forwarder
    pub tool_output: Option<Value>,
    /// Path of the session transcript
    pub transcript_path: Option<String>,
    /// Permission mode of the session
    pub permission_mode: Option<String>,
    /// When the hook fired (ISO 8601)
    pub timestamp: Option<String>,
}

impl HookPayload {
    /// Parsed event
    pub fn event(&self) -> HookEvent {
        HookEvent::parse(self.event_type.as_deref().unwrap_or_default())
    }

    /// Session id, `"default"` when missing or empty
    pub fn session_id(&self) -> &str {
        non_empty(self.session_id.as_deref()).unwrap_or("default")
    }

    /// Working directory, empty when missing
    pub fn cwd(&self) -> &str {
        self.cwd.as_deref().unwrap_or_default()
    }

    /// Tool name, empty when missing
    pub fn tool(&self) -> &str {
        self.tool.as_deref().unwrap_or_default()
    }

    /// Tool result under either field name
    pub fn tool_result(&self) -> Option<&Value> {
        self.tool_result
            .as_ref()
            .filter(|v| !v.is_null())
            .or_else(|| self.tool_output.as_ref().filter(|v| !v.is_null()))
    }

    /// Transcript path, `None` when missing or empty
    pub fn transcript_path(&self) -> Option<&str> {
        non_empty(self.transcript_path.as_deref())
    }

    /// Permission mode, `None` when missing or empty
    pub fn permission_mode(&self) -> Option<&str> {
        non_empty(self.permission_mode.as_deref())
    }
}

impl HookPayload {
    /// Build a payload from the JSON Claude Code passes to hook commands on stdin
    ///
    /// Claude Code uses snake_case names (`hook_event_name`, `tool_name`, ...). `pid`
    /// is the Claude Code process the forwarder was started by.
    pub fn from_cli_hook(input: &Value, pid: Option<u32>, timestamp: String) -> Self {
        Self {
            event_type: cli_string(input, "hook_event_name"),
            session_id: cli_string(input, "session_id"),
            cwd: cli_string(input, "cwd"),
            pid,
            tool: cli_string(input, "tool_name"),
            tool_input: cli_value(input, "tool_input"),
            tool_result: None,
            tool_output: cli_value(input, "tool_output").or_else(|| cli_value(input, "tool_response")),
            transcript_path: cli_string(input, "transcript_path"),
            permission_mode: cli_string(input, "permission_mode"),
            timestamp: Some(timestamp),
        }
    }
}

/// Body of `POST /pin` and `POST /unpin`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinPayload {
    /// Session id
    pub session_id: Option<String>,
    /// Directory to pin
    pub cwd: Option<String>,
}

impl PinPayload {
    /// Build a pin request from hook stdin, falling back to `cwd` for the directory
    pub fn from_cli_hook(input: Option<&Value>, cwd: Option<String>) -> Self {
        Self {
            session_id: input.and_then(|v| cli_string(v, "session_id")),
            cwd: input.and_then(|v| cli_string(v, "cwd")).or(cwd),
        }
    }
}

/// A request forwarded from the hook listener to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum HookMessage {
    /// `POST /hook`
    Hook(HookPayload),
    /// `POST /pin`
    Pin(PinPayload),
    /// `POST /unpin`
    Unpin(PinPayload),
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn cli_string(input: &Value, key: &str) -> Option<String> {
    input.get(key).and_then(Value::as_str).map(str::to_string)
}

fn cli_value(input: &Value, key: &str) -> Option<Value> {
    input.get(key).filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_payload() {
        let payload: HookPayload = serde_json::from_value(json!({
            "eventType": "PreToolUse",
            "sessionId": "abc123",
            "cwd": "C:/work/proj",
            "pid": 4242,
            "tool": "Bash",
            "toolInput": {"command": "ls"},
            "transcriptPath": "C:/t.jsonl",
            "permissionMode": "plan",
            "timestamp": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(payload.event(), HookEvent::PreToolUse);
        assert_eq!(payload.session_id(), "abc123");
        assert_eq!(payload.pid, Some(4242));
        assert_eq!(payload.tool(), "Bash");
        assert_eq!(payload.tool_input, Some(json!({"command": "ls"})));
        assert_eq!(payload.transcript_path(), Some("C:/t.jsonl"));
        assert_eq!(payload.permission_mode(), Some("plan"));
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let payload: HookPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.session_id(), "default");
        assert_eq!(payload.event(), HookEvent::Other(String::new()));
        assert_eq!(payload.cwd(), "");
        assert!(payload.transcript_path().is_none());
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let payload: HookPayload =
            serde_json::from_value(json!({"sessionId": "", "transcriptPath": "", "permissionMode": ""}))
                .unwrap();
        assert_eq!(payload.session_id(), "default");
        assert!(payload.transcript_path().is_none());
        assert!(payload.permission_mode().is_none());
    }

    #[test]
    fn test_tool_output_alias() {
        let payload: HookPayload =
            serde_json::from_value(json!({"toolOutput": {"exitCode": 1}, "toolResult": null}))
                .unwrap();
        assert_eq!(payload.tool_result(), Some(&json!({"exitCode": 1})));

        let both: HookPayload =
            serde_json::from_value(json!({"toolOutput": "b", "toolResult": "a"})).unwrap();
        assert_eq!(both.tool_result(), Some(&json!("a")));
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        assert!(serde_json::from_value::<HookPayload>(json!({"eventType": 5})).is_err());
        assert!(serde_json::from_value::<HookPayload>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<HookPayload>(json!({"pid": "x"})).is_err());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let payload: HookPayload =
            serde_json::from_value(json!({"eventType": "Stop", "extra": [1, 2, 3]})).unwrap();
        assert_eq!(payload.event(), HookEvent::Stop);
    }

    #[test]
    fn test_event_names_round_trip() {
        for name in [
            "PreToolUse",
            "PostToolUse",
            "Stop",
            "SubagentStop",
            "SessionStart",
            "SessionEnd",
            "Notification",
            "UserPromptSubmit",
            "PreCompact",
        ] {
            assert_eq!(HookEvent::parse(name).as_str(), name);
        }
    }

    #[test]
    fn test_from_cli_hook_maps_snake_case() {
        let input = json!({
            "hook_event_name": "PostToolUse",
            "session_id": "abc",
            "cwd": "C:\\code\\api",
            "tool_name": "Bash",
            "tool_input": {"command": "ls"},
            "tool_response": {"exitCode": 0},
            "transcript_path": "C:/t.jsonl",
            "permission_mode": "plan"
        });
        let payload = HookPayload::from_cli_hook(&input, Some(42), "2026-01-01T00:00:00Z".into());

        assert_eq!(payload.event(), HookEvent::PostToolUse);
        assert_eq!(payload.session_id(), "abc");
        assert_eq!(payload.pid, Some(42));
        assert_eq!(payload.tool(), "Bash");
        assert_eq!(payload.tool_result(), Some(&json!({"exitCode": 0})));
        assert_eq!(payload.permission_mode(), Some("plan"));

        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(wire["eventType"], "PostToolUse");
        assert_eq!(wire["transcriptPath"], "C:/t.jsonl");
        assert_eq!(wire["timestamp"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_pin_from_cli_falls_back_to_cwd() {
        let pin = PinPayload::from_cli_hook(None, Some("/w/api".into()));
        assert_eq!(pin.cwd.as_deref(), Some("/w/api"));
        assert_eq!(pin.session_id, None);

        let input = json!({"session_id": "s1", "cwd": "/w/web"});
        let pin = PinPayload::from_cli_hook(Some(&input), Some("/w/api".into()));
        assert_eq!(pin.session_id.as_deref(), Some("s1"));
        assert_eq!(pin.cwd.as_deref(), Some("/w/web"));
    }
}
