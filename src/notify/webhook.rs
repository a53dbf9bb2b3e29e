//! Webhook delivery for Discord, Slack and generic JSON endpoints
//!
//! Sends are fire-and-forget on a short-lived thread so the controller loop never waits
//! on the network. Paths and session ids are redacted before anything leaves the machine.

use crate::error::{NotchError, Result, StringError};
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// Minimum time between two webhook sends
pub const RATE_LIMIT: Duration = Duration::from_secs(5);

/// Longest `Retry-After` honored on a 429
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "ClaudeNotch/1.0";

const DISCORD_COLOR_DEFAULT: u32 = 0x0080_8080;

static WINDOWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z]:[\\/](?:[^\\/\s]+[\\/])+([^\\/\s]+)").expect("valid Windows path pattern")
});
static UNIX_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?:[^/\s]+/)+([^/\s]+)").expect("valid Unix path pattern")
});
static LONG_HEX_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([0-9a-fA-F]{8})[0-9a-fA-F]{8,}\b").expect("valid hex id pattern")
});

/// Payload layout expected by the receiving service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookFormat {
    /// Discord webhook (embeds)
    Discord,
    /// Slack incoming webhook (`text`)
    Slack,
    /// Plain JSON object with the event fields
    Generic,
}

impl WebhookFormat {
    /// Pick the format from the URL
    pub fn detect(url: &str) -> Self {
        if url.contains("discord.com/api/webhooks") {
            Self::Discord
        } else if url.contains("hooks.slack.com") {
            Self::Slack
        } else {
            Self::Generic
        }
    }
}

/// Embed color for a Discord message
pub fn discord_color(event_type: &str) -> u32 {
    match event_type {
        "error" => 0x00FF_0000,
        "attention" => 0x00FF_A500,
        "session_end" => 0x004A_9EFF,
        _ => DISCORD_COLOR_DEFAULT,
    }
}

/// Reduce absolute paths to their last component and shorten long hex ids
pub fn redact(text: &str) -> String {
    let text = WINDOWS_PATH.replace_all(text, "${1}");
    let text = UNIX_PATH.replace_all(&text, "${1}");
    LONG_HEX_ID.replace_all(&text, "${1}...").into_owned()
}

/// Build the request body for `format`, redacting every user-visible field
pub fn build_payload(
    format: WebhookFormat,
    event_type: &str,
    title: &str,
    message: &str,
    project: &str,
) -> Value {
    let title = redact(title);
    let message = redact(message);

    match format {
        WebhookFormat::Discord => json!({
            "content": message,
            "embeds": [{
                "title": title,
                "description": message,
                "color": discord_color(event_type),
            }],
        }),
        WebhookFormat::Slack => json!({"text": format!("{title}: {message}")}),
        WebhookFormat::Generic => json!({
            "event_type": event_type,
            "title": title,
            "message": message,
            "project": redact(project),
        }),
    }
}

enum Delivery {
    Sent,
    RetryAfter(Duration),
}

/// Rate-limited webhook sender
#[derive(Debug, Default)]
pub struct WebhookDispatcher {
    url: String,
    last_send: Option<Instant>,
}

impl WebhookDispatcher {
    /// Dispatcher for `url`; an empty URL disables sending
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            last_send: None,
        }
    }

    /// Current target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the target URL
    pub fn set_url(&mut self, url: &str) {
        self.url = url.trim().to_string();
    }

    /// Queue an event for delivery on a background thread
    ///
    /// Returns `false` when nothing was sent: no URL, or still inside the rate limit window.
    pub fn send(&mut self, event_type: &str, title: &str, message: &str, project: &str) -> bool {
        use tracing::{debug, warn};

        if !self.try_acquire(Instant::now()) {
            return false;
        }

        let url = self.url.clone();
        let payload = build_payload(WebhookFormat::detect(&url), event_type, title, message, project);
        let event_type = event_type.to_string();

        let spawned = std::thread::Builder::new()
            .name("webhook".to_string())
            .spawn(move || deliver(&url, &payload, &event_type));
        if let Err(e) = spawned {
            warn!("Failed to spawn webhook thread: {}", e);
            return false;
        }
        debug!("Webhook queued");
        true
    }

    /// Send a test message synchronously, bypassing the rate limit
    ///
    /// Returns `(true, "OK")` on success or `(false, reason)`.
    pub fn send_test(&self, url: &str) -> (bool, String) {
        let payload = build_payload(
            WebhookFormat::detect(url),
            "test",
            "Webhook Test",
            "If you see this, the webhook is configured correctly.",
            "claude-notch",
        );

        let result = build_client().and_then(|client| match post(&client, url, &payload)? {
            Delivery::Sent => Ok(()),
            Delivery::RetryAfter(_) => Err(NotchError::WebhookError(StringError::new(
                "Rate limited by the webhook endpoint",
            ))),
        });
        match result {
            Ok(()) => (true, "OK".to_string()),
            Err(e) => (false, e.to_string()),
        }
    }

    /// Claim the send slot at `now`
    fn try_acquire(&mut self, now: Instant) -> bool {
        use tracing::debug;

        if self.url.is_empty() {
            return false;
        }
        if let Some(last) = self.last_send
            && now.saturating_duration_since(last) < RATE_LIMIT
        {
            debug!("Webhook rate-limited, dropping event");
            return false;
        }
        self.last_send = Some(now);
        true
    }
}

fn deliver(url: &str, payload: &Value, event_type: &str) {
    use tracing::{debug, info, warn};

    let client = match build_client() {
        Ok(client) => client,
        Err(e) => {
            warn!("Webhook send failed: {}", e);
            return;
        }
    };

    match post(&client, url, payload) {
        Ok(Delivery::Sent) => debug!("Webhook sent: {}", event_type),
        Ok(Delivery::RetryAfter(delay)) => {
            info!("Webhook 429, retrying after {:.1}s", delay.as_secs_f64());
            std::thread::sleep(delay);
            match post(&client, url, payload) {
                Ok(Delivery::Sent) => debug!("Webhook retry succeeded"),
                Ok(Delivery::RetryAfter(_)) => warn!("Webhook retry was rate limited again"),
                Err(e) => warn!("Webhook retry failed: {}", e),
            }
        }
        Err(e) => warn!("Webhook send failed: {}", e),
    }
}

fn build_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| NotchError::WebhookError(Box::new(e)))
}

fn post(client: &reqwest::blocking::Client, url: &str, payload: &Value) -> Result<Delivery> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .map_err(|e| NotchError::WebhookError(Box::new(e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let header = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok());
        return Ok(Delivery::RetryAfter(retry_delay(header)));
    }
    if !status.is_success() {
        return Err(NotchError::WebhookError(StringError::new(format!(
            "Webhook endpoint returned {status}"
        ))));
    }
    Ok(Delivery::Sent)
}

/// Delay before retrying a 429, from the `Retry-After` seconds value
fn retry_delay(header: Option<&str>) -> Duration {
    header
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(RATE_LIMIT, |secs| {
            Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            WebhookFormat::detect("https://discord.com/api/webhooks/1/abc"),
            WebhookFormat::Discord
        );
        assert_eq!(
            WebhookFormat::detect("https://hooks.slack.com/services/T/B/X"),
            WebhookFormat::Slack
        );
        assert_eq!(WebhookFormat::detect("https://example.com/hook"), WebhookFormat::Generic);
    }

    #[test]
    fn test_discord_payload() {
        let payload = build_payload(WebhookFormat::Discord, "error", "Claude Code Error", "Error in Bash", "p");
        assert_eq!(payload["content"], "Error in Bash");
        assert_eq!(payload["embeds"][0]["title"], "Claude Code Error");
        assert_eq!(payload["embeds"][0]["color"], 0xFF0000);

        let other = build_payload(WebhookFormat::Discord, "test", "t", "m", "p");
        assert_eq!(other["embeds"][0]["color"], 0x808080);
    }

    #[test]
    fn test_slack_and_generic_payloads() {
        let slack = build_payload(WebhookFormat::Slack, "attention", "Claude Code", "Waiting", "p");
        assert_eq!(slack, json!({"text": "Claude Code: Waiting"}));

        let generic = build_payload(WebhookFormat::Generic, "session_end", "T", "M", "/home/me/proj");
        assert_eq!(
            generic,
            json!({"event_type": "session_end", "title": "T", "message": "M", "project": "proj"})
        );
    }

    #[test]
    fn test_redact_paths() {
        assert_eq!(redact(r"Session ended: C:\Users\me\code\notch"), "Session ended: notch");
        assert_eq!(redact("C:/Users/me/app done"), "app done");
        assert_eq!(redact("in /home/me/work/api now"), "in api now");
        assert_eq!(redact("plain text"), "plain text");
    }

    #[test]
    fn test_redaction_patterns_compile() {
        for pattern in [&*WINDOWS_PATH, &*UNIX_PATH, &*LONG_HEX_ID] {
            assert_eq!(pattern.captures_len(), 2, "{pattern}");
        }
    }

    #[test]
    fn test_redact_long_hex_ids() {
        assert_eq!(redact("id 0123456789abcdef0123"), "id 01234567...");
        assert_eq!(redact("short deadbeef"), "short deadbeef");
    }

    #[test]
    fn test_rate_limit_window() {
        let mut dispatcher = WebhookDispatcher::new("https://example.com/hook");
        let t0 = Instant::now();
        assert!(dispatcher.try_acquire(t0));
        assert!(!dispatcher.try_acquire(t0 + Duration::from_secs(4)));
        assert!(dispatcher.try_acquire(t0 + RATE_LIMIT));
    }

    #[test]
    fn test_empty_url_never_sends() {
        let mut dispatcher = WebhookDispatcher::new("   ");
        assert_eq!(dispatcher.url(), "");
        assert!(!dispatcher.try_acquire(Instant::now()));
        assert!(!dispatcher.send("error", "t", "m", "p"));
    }

    #[test]
    fn test_retry_delay() {
        assert_eq!(retry_delay(None), RATE_LIMIT);
        assert_eq!(retry_delay(Some("2")), Duration::from_secs(2));
        assert_eq!(retry_delay(Some("120")), MAX_RETRY_AFTER);
        assert_eq!(retry_delay(Some("soon")), RATE_LIMIT);
    }

    #[test]
    fn test_send_test_reports_failure() {
        let dispatcher = WebhookDispatcher::default();
        let (ok, reason) = dispatcher.send_test("not a url");
        assert!(!ok);
        assert!(!reason.is_empty());
    }
}
