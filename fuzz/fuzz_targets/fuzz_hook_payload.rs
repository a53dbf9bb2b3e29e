#![no_main]

use claude_notch::server::{HookMessage, HookPayload};
use claude_notch::session::{SessionStats, StateManager};
use claude_notch::config::NotchConfig;
use libfuzzer_sys::fuzz_target;
use std::sync::mpsc;

fuzz_target!(|data: &[u8]| {
    // Any body the listener accepts must be safe to feed to the state machine
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(payload) = serde_json::from_str::<HookPayload>(s) {
            let (tx, _rx) = mpsc::channel();
            let mut state = StateManager::new(NotchConfig::embedded(), SessionStats::in_memory(), tx);
            state.handle_message(HookMessage::Hook(payload));
            let _ = state.status_snapshot(std::time::Instant::now());
        }
    }
});
