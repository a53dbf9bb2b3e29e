//! Hook forwarder for Claude Code
//!
//! Registered as a command hook in `~/.claude/settings.json`. Reads the hook JSON from
//! stdin and posts it to the Claude Notch listener. `notch-hook pin` and
//! `notch-hook unpin` pin or unpin the current project instead.
//!
//! Claude Code waits for hooks to finish, so every failure is swallowed and the
//! process always exits 0 within the request timeout.

use anyhow::{Context, Result};
use claude_notch::server::payload::{HookPayload, PinPayload};
use claude_notch::utils::window_focus::parent_pid;
use serde_json::Value;
use std::io::{IsTerminal, Read};
use std::time::Duration;

/// Listener port when `NOTCH_PORT` is unset
const DEFAULT_PORT: u16 = 27182;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

fn main() {
    let _ = run();
}

fn run() -> Result<()> {
    let command = std::env::args().nth(1);
    let input = read_stdin();

    let (route, body) = match command.as_deref() {
        Some(route @ ("pin" | "unpin")) => {
            let cwd = std::env::current_dir()
                .ok()
                .map(|dir| dir.to_string_lossy().into_owned());
            let pin = PinPayload::from_cli_hook(input.as_ref(), cwd);
            (route, serde_json::to_value(pin)?)
        }
        _ => {
            let Some(input) = input else {
                return Ok(());
            };
            let payload =
                HookPayload::from_cli_hook(&input, parent_pid(), chrono::Utc::now().to_rfc3339());
            ("hook", serde_json::to_value(payload)?)
        }
    };

    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?
        .post(format!("http://127.0.0.1:{}/{route}", port()))
        .json(&body)
        .send()
        .context("Claude Notch is not running")?;
    Ok(())
}

/// Hook JSON from stdin, `None` when stdin is a terminal, empty or not JSON
fn read_stdin() -> Option<Value> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut raw = String::new();
    stdin.read_to_string(&mut raw).ok()?;
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(&raw).ok()
}

fn port() -> u16 {
    std::env::var("NOTCH_PORT")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}
