#![allow(clippy::unwrap_used)]
//! Benchmarks for hook request parsing and routing

#![allow(missing_docs)]

use claude_notch::server::HookPayload;
use claude_notch::server::hook_server::{dispatch, new_status_handle};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::mpsc;
use tiny_http::Method;

const PRE_TOOL_USE: &str = r#"{
    "eventType": "PreToolUse",
    "sessionId": "3f2a9c1e-7b44-4d0e-9a61-5c8e2b7d1f00",
    "cwd": "C:\\Users\\dev\\code\\claude-notch",
    "pid": 18244,
    "tool": "Bash",
    "toolInput": {"command": "cargo build --release", "description": "Build"},
    "transcriptPath": "C:\\Users\\dev\\.claude\\projects\\notch\\3f2a9c1e.jsonl",
    "permissionMode": "default",
    "timestamp": "2026-01-01T12:00:00+00:00"
}"#;

fn bench_parse_payload(c: &mut Criterion) {
    c.bench_function("hook_payload_parse", |b| {
        b.iter(|| {
            let payload: HookPayload = serde_json::from_str(black_box(PRE_TOOL_USE)).unwrap();
            black_box(payload.event());
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let (tx, rx) = mpsc::sync_channel(1024);
    let status = new_status_handle();

    c.bench_function("hook_dispatch", |b| {
        b.iter(|| {
            let reply = dispatch(&Method::Post, "/hook", black_box(PRE_TOOL_USE), &tx, &status);
            black_box(reply);
            while rx.try_recv().is_ok() {}
        });
    });
}

criterion_group!(benches, bench_parse_payload, bench_dispatch);
criterion_main!(benches);
