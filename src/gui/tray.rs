//! System tray integration
//!
//! The tray icon is the whole user interface: a 32x32 activity grid redrawn from each
//! [`TrayModel`] the controller sends, a tooltip with the current tool and project,
//! and a context menu whose clicks are forwarded as [`MenuCommand`]s.
//!
//! On Windows the GUI thread owns the icon and pumps Win32 messages with
//! `PeekMessageW` between frames. Elsewhere there is no tray; the loop only logs
//! tooltip changes until the controller shuts down.

use claude_notch::controller::AppMessage;
use claude_notch::view::TrayModel;
use std::sync::mpsc;
use std::time::Duration;

/// How long the GUI loop waits for a frame before pumping messages again
const FRAME_WAIT: Duration = Duration::from_millis(16);

#[cfg(windows)]
use claude_notch::controller::MenuCommand;
#[cfg(windows)]
use claude_notch::error::{NotchError, Result, StringError};

#[cfg(windows)]
use tray_icon::{
    Icon, TrayIconBuilder,
    menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem},
};

/// System tray icon with context menu
#[cfg(windows)]
pub struct TrayIcon {
    tray: tray_icon::TrayIcon,
    tooltip: String,
}

#[cfg(windows)]
impl TrayIcon {
    /// Create the tray icon showing `model`
    ///
    /// `launch_on_startup` sets the initial check mark of the startup item.
    pub fn new(model: &TrayModel, launch_on_startup: bool) -> Result<Self> {
        use tracing::{debug, info};

        info!("Creating system tray icon");

        let tray_menu = Menu::new();
        for command in MenuCommand::ALL {
            if command == MenuCommand::Quit {
                append(&tray_menu, &PredefinedMenuItem::separator())?;
            }
            if command == MenuCommand::ToggleStartup {
                let item = CheckMenuItem::with_id(
                    command.id(),
                    command.label(),
                    true,
                    launch_on_startup,
                    None,
                );
                append(&tray_menu, &item)?;
            } else {
                append(&tray_menu, &MenuItem::with_id(command.id(), command.label(), true, None))?;
            }
        }
        debug!("Tray menu created with {} commands", MenuCommand::ALL.len());

        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(tray_menu))
            .with_icon(Self::icon_for(model)?)
            .with_tooltip(&model.tooltip)
            .build()
            .map_err(|e| {
                NotchError::TrayError(StringError::new(format!("Failed to build tray icon: {e}")))
            })?;

        info!("System tray icon created successfully");

        Ok(Self {
            tray,
            tooltip: model.tooltip.clone(),
        })
    }

    /// Redraw the icon and, if it changed, the tooltip
    pub fn update(&mut self, model: &TrayModel) -> Result<()> {
        self.tray.set_icon(Some(Self::icon_for(model)?)).map_err(|e| {
            NotchError::TrayError(StringError::new(format!("Failed to set tray icon: {e}")))
        })?;

        if model.tooltip != self.tooltip {
            self.tray.set_tooltip(Some(&model.tooltip)).map_err(|e| {
                NotchError::TrayError(StringError::new(format!("Failed to set tooltip: {e}")))
            })?;
            self.tooltip.clone_from(&model.tooltip);
        }
        Ok(())
    }

    fn icon_for(model: &TrayModel) -> Result<Icon> {
        let (rgba, width, height) = claude_notch::view::icon::icon_rgba(model);
        Icon::from_rgba(rgba, width, height).map_err(|e| {
            NotchError::TrayError(StringError::new(format!("Failed to create icon from RGBA: {e}")))
        })
    }
}

#[cfg(windows)]
fn append(menu: &Menu, item: &dyn tray_icon::menu::IsMenuItem) -> Result<()> {
    menu.append(item).map_err(|e| {
        NotchError::TrayError(StringError::new(format!("Failed to add menu item: {e}")))
    })
}

/// Run the tray until the controller stops sending frames
///
/// The icon is created from the first frame. Menu clicks are forwarded to
/// `app_sender`. Returns once the controller loop has exited (its tray sender is
/// dropped) or a `WM_QUIT` arrives.
#[cfg(windows)]
pub fn run_tray_loop(
    frames: &mpsc::Receiver<TrayModel>,
    app_sender: &mpsc::SyncSender<AppMessage>,
    launch_on_startup: bool,
) -> Result<()> {
    use std::sync::mpsc::RecvTimeoutError;
    use tracing::{info, warn};

    let Ok(initial) = frames.recv() else {
        return Ok(());
    };
    let mut tray = TrayIcon::new(&initial, launch_on_startup)?;
    let menu_events = MenuEvent::receiver();

    loop {
        if !pump_messages() {
            info!("WM_QUIT received, leaving tray loop");
            let _ = app_sender.send(AppMessage::Shutdown);
            break;
        }

        while let Ok(event) = menu_events.try_recv() {
            let Some(command) = MenuCommand::from_id(event.id.0.as_str()) else {
                continue;
            };
            if app_sender.send(AppMessage::Menu(command)).is_err() {
                return Ok(());
            }
        }

        match frames.recv_timeout(FRAME_WAIT) {
            Ok(frame) => {
                // Only the newest frame matters
                let frame = frames.try_iter().last().unwrap_or(frame);
                if let Err(e) = tray.update(&frame) {
                    warn!("Failed to update tray icon: {}", e);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("Tray loop exited");
    Ok(())
}

/// Dispatch pending Win32 messages, returning false on `WM_QUIT`
#[cfg(windows)]
#[allow(unsafe_code)] // Windows FFI for the message pump
fn pump_messages() -> bool {
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage, WM_QUIT,
    };

    let mut msg = MSG::default();
    // SAFETY: msg is a valid out pointer for the duration of each call
    unsafe {
        while PeekMessageW(&raw mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            if msg.message == WM_QUIT {
                return false;
            }
            let _ = TranslateMessage(&raw const msg);
            let _ = DispatchMessageW(&raw const msg);
        }
    }
    true
}

/// Headless stand-in for the tray on platforms without one
#[cfg(not(windows))]
pub fn run_tray_loop(
    frames: &mpsc::Receiver<TrayModel>,
    _app_sender: &mpsc::SyncSender<AppMessage>,
    _launch_on_startup: bool,
) -> claude_notch::error::Result<()> {
    use std::sync::mpsc::RecvTimeoutError;
    use tracing::{debug, info};

    info!("No system tray on this platform, running headless");
    let mut tooltip = String::new();

    loop {
        match frames.recv_timeout(FRAME_WAIT) {
            Ok(frame) => {
                if frame.tooltip != tooltip {
                    debug!("Tray: {}", frame.tooltip.replace('\n', " | "));
                    tooltip = frame.tooltip;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("Tray loop exited");
    Ok(())
}
