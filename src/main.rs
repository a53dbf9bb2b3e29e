//! Claude Notch - Claude Code activity in the Windows system tray
//!
//! Listens for hook events from the `notch-hook` forwarder on a local port and shows
//! what Claude Code is doing as an animated tray icon.

// Set Windows subsystem to hide console window
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// GUI module is only in the binary, not the library
mod gui;

use anyhow::{Context, Result};
use claude_notch::{
    config::{NotchConfig, SettingsManager},
    controller::{AppController, AppMessage, app_controller::TRAY_CHANNEL_CAPACITY},
    error::get_user_friendly_error,
    server::{HookServer, new_status_handle},
    session::SessionStats,
    utils,
};
use std::sync::{Arc, mpsc};
use tracing::{error, info, warn};

/// Capacity of the hook listener to controller channel
const APP_CHANNEL_CAPACITY: usize = 256;

/// Main entry point for the application
///
/// Startup order: logging, single instance check, settings and design config, the
/// hook listener, the controller thread, then the tray loop on the main thread.
fn main() -> Result<()> {
    utils::init_logging().context("Failed to initialize logging system")?;

    info!("Claude Notch v{} starting...", env!("CARGO_PKG_VERSION"));

    // Must happen before the port is bound
    let _single_instance_guard = match utils::SingleInstanceGuard::new() {
        Ok(guard) => guard,
        Err(e) => {
            error!("Single instance check failed: {}", e);
            show_error_and_exit(&get_user_friendly_error(&e));
            return Err(e.into());
        }
    };

    info!("Single instance check passed");

    let settings = SettingsManager::load();
    let config = NotchConfig::load(&SettingsManager::get_settings_dir());
    let stats = SessionStats::load();
    let launch_on_startup = settings.settings().launch_on_startup;
    let port = settings.settings().server_port;

    if let Err(e) = utils::AutoStartManager::sync(launch_on_startup) {
        warn!("Failed to sync launch on startup: {}", e);
    }

    let (app_tx, app_rx) = mpsc::sync_channel(APP_CHANNEL_CAPACITY);
    let (tray_tx, tray_rx) = mpsc::sync_channel(TRAY_CHANNEL_CAPACITY);
    let status = new_status_handle();

    let mut server = match HookServer::start(port, app_tx.clone(), Arc::clone(&status)) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start hook listener: {}", e);
            show_error_and_exit(&get_user_friendly_error(&e));
            return Err(e).context("Failed to start hook listener");
        }
    };

    info!("Creating application controller");
    let mut controller = AppController::new(config, stats, settings, status, app_tx.clone(), tray_tx);
    controller.start_hotkey();
    let controller_handle = controller
        .spawn_event_loop(app_rx)
        .context("Failed to spawn controller thread")?;

    info!("Starting tray loop");
    let tray_result = gui::run_tray_loop(&tray_rx, &app_tx, launch_on_startup);

    // No-op if the controller already stopped
    let _ = app_tx.send(AppMessage::Shutdown);
    if controller_handle.join().is_err() {
        error!("Controller thread panicked");
    }
    server.shutdown();

    if let Err(e) = tray_result {
        error!("Tray loop failed: {}", e);
        show_error_and_exit(&get_user_friendly_error(&e));
        return Err(e).context("Tray loop failed");
    }

    info!("Claude Notch exited");
    Ok(())
}

/// Shows an error dialog and exits the application.
#[cfg(windows)]
fn show_error_and_exit(message: &str) {
    use rfd::MessageDialog;

    MessageDialog::new()
        .set_title("Claude Notch - Error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .set_level(rfd::MessageLevel::Error)
        .show();

    std::process::exit(1);
}

/// Shows an error dialog and exits the application (non-Windows fallback).
#[cfg(not(windows))]
fn show_error_and_exit(message: &str) {
    eprintln!("ERROR: {message}");
    std::process::exit(1);
}
