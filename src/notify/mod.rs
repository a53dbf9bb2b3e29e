//! Sounds, toasts, tray flashes and webhooks

pub mod notification_manager;
pub mod webhook;

pub use notification_manager::{NotificationEffect, NotificationManager, SoundCue};
pub use webhook::WebhookDispatcher;
