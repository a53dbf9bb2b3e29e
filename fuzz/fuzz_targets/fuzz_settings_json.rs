#![no_main]

use claude_notch::config::UserSettings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Settings loading validates each key on its own and must never panic
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(s) {
            let settings = UserSettings::from_json_value(&value);
            let _ = settings.to_json_value();
        }
    }
});
