//! Presentation models
//!
//! Plain data derived from session state. Nothing here touches a window or the tray;
//! the GUI thread only renders what it receives.

pub mod activity;
pub mod icon;
pub mod overlay_model;
pub mod tray_model;

pub use activity::ActivityIndicator;
pub use overlay_model::{CardMode, OverlayModel, SessionCard, TimelineSegment};
pub use tray_model::{ContextBar, ErrorFlash, IconStyle, TrayModel, TrayTarget};
