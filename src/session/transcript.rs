//! Token usage from Claude Code transcripts
//!
//! Transcripts are JSONL files. Each assistant line carries the usage of that
//! turn, so the last one describes the current context window.

use crate::controller::AppMessage;
use crate::session::models::TokenStats;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

#[derive(Deserialize)]
struct TranscriptLine {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<TranscriptMessage>,
}

#[derive(Deserialize)]
struct TranscriptMessage {
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: u64,
}

/// Usage of the last assistant turn in a transcript
///
/// Unreadable lines are skipped. Returns `None` for missing files and transcripts
/// without any assistant usage.
pub fn read_last_usage(path: &Path) -> Option<TokenStats> {
    use tracing::debug;

    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Cannot open transcript {}: {}", path.display(), e);
            return None;
        }
    };

    let mut last = None;
    for line in BufReader::new(file).split(b'\n') {
        let Ok(bytes) = line else {
            break;
        };
        let Ok(line) = std::str::from_utf8(&bytes) else {
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Ok(entry) = serde_json::from_str::<TranscriptLine>(line) else {
            continue;
        };
        if entry.kind.as_deref() != Some("assistant") {
            continue;
        }
        if let Some(usage) = entry.message.and_then(|m| m.usage) {
            last = Some(TokenStats {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                cache_creation_tokens: usage.cache_creation_input_tokens,
                cache_read_tokens: usage.cache_read_input_tokens,
            });
        }
    }

    last
}

/// Reads transcripts off the controller thread
pub struct TranscriptReader;

impl TranscriptReader {
    /// Parse `path` on a background thread and report the result as [`AppMessage::TokenUsage`]
    ///
    /// Nothing is sent when the transcript has no usage.
    pub fn spawn_read(
        session_id: String,
        path: PathBuf,
        sender: mpsc::SyncSender<AppMessage>,
    ) -> std::io::Result<std::thread::JoinHandle<()>> {
        std::thread::Builder::new()
            .name("transcript-reader".to_string())
            .spawn(move || {
                use tracing::debug;

                if let Some(usage) = read_last_usage(&path) {
                    if sender
                        .send(AppMessage::TokenUsage { session_id, usage })
                        .is_err()
                    {
                        debug!("Controller gone, dropping token usage");
                    }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dir;

    fn write_lines(path: &Path, lines: &[serde_json::Value]) {
        let text: Vec<String> = lines.iter().map(ToString::to_string).collect();
        std::fs::write(path, text.join("\n")).unwrap();
    }

    #[test]
    fn test_reads_last_assistant_usage() {
        let dir = create_test_dir();
        let path = dir.path().join("transcript.jsonl");
        write_lines(
            &path,
            &[
                serde_json::json!({"type": "user", "message": {"role": "user", "content": "hello"}}),
                serde_json::json!({"type": "assistant", "message": {"role": "assistant", "usage": {
                    "input_tokens": 100, "output_tokens": 50,
                    "cache_creation_input_tokens": 10, "cache_read_input_tokens": 20}}}),
                serde_json::json!({"type": "user", "message": {"role": "user", "content": "world"}}),
                serde_json::json!({"type": "assistant", "message": {"role": "assistant", "usage": {
                    "input_tokens": 500, "output_tokens": 150,
                    "cache_creation_input_tokens": 100, "cache_read_input_tokens": 600}}}),
            ],
        );

        let usage = read_last_usage(&path).unwrap();
        assert_eq!(usage.input_tokens, 500);
        assert_eq!(usage.output_tokens, 150);
        assert_eq!(usage.cache_creation_tokens, 100);
        assert_eq!(usage.cache_read_tokens, 600);
    }

    #[test]
    fn test_empty_and_missing_transcripts() {
        let dir = create_test_dir();
        let path = dir.path().join("empty.jsonl");
        std::fs::write(&path, "").unwrap();
        assert!(read_last_usage(&path).is_none());
        assert!(read_last_usage(&dir.path().join("missing.jsonl")).is_none());
    }

    #[test]
    fn test_skips_garbage_and_user_lines() {
        let dir = create_test_dir();
        let path = dir.path().join("mixed.jsonl");
        std::fs::write(
            &path,
            "not json\n{\"type\":\"user\",\"message\":{\"usage\":{\"input_tokens\":9}}}\n\n\
             {\"type\":\"assistant\",\"message\":{\"usage\":{\"input_tokens\":7}}}\n{truncated",
        )
        .unwrap();

        let usage = read_last_usage(&path).unwrap();
        assert_eq!(usage.input_tokens, 7);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn test_non_utf8_line_does_not_end_scan() {
        let dir = create_test_dir();
        let path = dir.path().join("binary.jsonl");
        let mut contents =
            br#"{"type":"assistant","message":{"usage":{"input_tokens":10,"output_tokens":1}}}"#.to_vec();
        contents.extend_from_slice(b"\n\xff\xfe not utf-8\n");
        contents.extend_from_slice(
            br#"{"type":"assistant","message":{"usage":{"input_tokens":20,"output_tokens":2}}}"#,
        );
        std::fs::write(&path, contents).unwrap();

        let usage = read_last_usage(&path).unwrap();
        assert_eq!(usage.input_tokens, 20);
        assert_eq!(usage.output_tokens, 2);
    }

    #[test]
    fn test_spawn_read_sends_token_usage() {
        let dir = create_test_dir();
        let path = dir.path().join("t.jsonl");
        std::fs::write(
            &path,
            "{\"type\":\"assistant\",\"message\":{\"usage\":{\"input_tokens\":42}}}",
        )
        .unwrap();

        let (tx, rx) = mpsc::sync_channel(4);
        TranscriptReader::spawn_read("s1".to_string(), path, tx)
            .unwrap()
            .join()
            .unwrap();

        match rx.try_recv().unwrap() {
            AppMessage::TokenUsage { session_id, usage } => {
                assert_eq!(session_id, "s1");
                assert_eq!(usage.input_tokens, 42);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
