//! Session tracking
//!
//! This module turns Claude Code hook events into per-session state: the tool
//! currently running, recent tools, context usage, and idle/stale bookkeeping.

pub mod models;
pub mod state_manager;
pub mod stats;
pub mod transcript;

pub use models::{ActiveTool, SessionState, TokenStats};
pub use state_manager::{StateEvent, StateManager};
pub use stats::SessionStats;
pub use transcript::TranscriptReader;
