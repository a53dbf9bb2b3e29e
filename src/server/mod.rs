//! Local hook listener
//!
//! Receives lifecycle events posted by the `notch-hook` forwarder and hands them to
//! the controller.

pub mod hook_server;
pub mod payload;

pub use hook_server::{HookServer, StatusHandle, new_status_handle};
pub use payload::{HookEvent, HookMessage, HookPayload, PinPayload};
