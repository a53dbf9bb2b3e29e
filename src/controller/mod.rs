//! Application logic controller module
//!
//! The controller owns the session state and is the only place where hook events,
//! transcript readings, hotkey presses and tray menu commands are applied.
//!
//! # Event Flow
//!
//! ```text
//! HookServer ──┐
//! Transcript ──┼─→ AppMessage → AppController → StateManager
//! Hotkey     ──┤                     │              │
//! Tray menu  ──┘                     │          StateEvent
//!                                    ↓              ↓
//!                      TrayModel → GUI    notifications, transcript reads
//! ```
//!
//! Everything runs on the controller thread, so the state needs no locking. The only
//! shared value is the `/status` snapshot, published into a [`crate::server::StatusHandle`]
//! once per loop iteration.

pub mod app_controller;

pub use app_controller::{AppController, AppMessage, MenuCommand};
