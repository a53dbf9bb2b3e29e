//! GUI module
//!
//! System tray icon and menu, fed by tray frames from the application controller.

pub mod tray;

pub use tray::run_tray_loop;
