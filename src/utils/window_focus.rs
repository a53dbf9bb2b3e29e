//! Terminal window lookup and focusing
//!
//! Claude Code runs inside a shell inside a terminal. Starting from the Claude Code
//! pid, the process tree is walked upwards until a process owning a visible
//! top-level window is found. Window handles are passed around as `isize`.

/// How many ancestors are checked before giving up
pub const MAX_TREE_DEPTH: usize = 10;

/// Find the terminal window hosting `pid`
#[cfg(windows)]
pub fn find_terminal_window(pid: u32) -> Option<isize> {
    use tracing::debug;

    let parents = build_process_tree();
    let mut current = pid;

    for level in 0..MAX_TREE_DEPTH {
        if let Some(hwnd) = find_window_for_pid(current) {
            debug!("Found terminal window {:#x} for pid {} at level {}", hwnd, current, level);
            return Some(hwnd);
        }

        match parents.get(&current) {
            Some(&parent) if parent != current && parent != 0 => current = parent,
            _ => break,
        }
    }

    debug!("No terminal window found for pid {}", pid);
    None
}

/// Bring a window to the foreground, restoring it if minimized
#[cfg(windows)]
#[allow(unsafe_code)] // Windows FFI for window activation
pub fn focus_window(hwnd: isize) -> bool {
    use tracing::debug;
    use windows::Win32::UI::WindowsAndMessaging::{SW_RESTORE, SetForegroundWindow, ShowWindow};

    if !is_window_valid(hwnd) {
        debug!("focus_window: {:#x} is not a valid window", hwnd);
        return false;
    }

    let hwnd = to_hwnd(hwnd);
    unsafe {
        let _ = ShowWindow(hwnd, SW_RESTORE);
        let focused = SetForegroundWindow(hwnd).as_bool();
        if !focused {
            debug!("SetForegroundWindow refused");
        }
        focused
    }
}

/// Whether `hwnd` still refers to a window
#[cfg(windows)]
#[allow(unsafe_code)] // Windows FFI
pub fn is_window_valid(hwnd: isize) -> bool {
    use windows::Win32::UI::WindowsAndMessaging::IsWindow;

    hwnd != 0 && unsafe { IsWindow(Some(to_hwnd(hwnd))).as_bool() }
}

#[cfg(windows)]
fn to_hwnd(hwnd: isize) -> windows::Win32::Foundation::HWND {
    windows::Win32::Foundation::HWND(hwnd as *mut std::ffi::c_void)
}

/// Map of pid to parent pid from a process snapshot
#[cfg(windows)]
#[allow(unsafe_code)] // Windows FFI for Toolhelp32 snapshots
fn build_process_tree() -> std::collections::HashMap<u32, u32> {
    use std::collections::HashMap;
    use tracing::debug;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    };

    let mut parents = HashMap::new();

    unsafe {
        let snapshot = match CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) {
            Ok(handle) => handle,
            Err(e) => {
                debug!("CreateToolhelp32Snapshot failed: {}", e);
                return parents;
            }
        };

        let mut entry = PROCESSENTRY32W {
            dwSize: u32::try_from(std::mem::size_of::<PROCESSENTRY32W>()).unwrap_or(u32::MAX),
            ..Default::default()
        };

        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                parents.insert(entry.th32ProcessID, entry.th32ParentProcessID);
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }

        let _ = CloseHandle(snapshot);
    }

    parents
}

/// First visible top-level window owned by `pid`
#[cfg(windows)]
#[allow(unsafe_code)] // Windows FFI for window enumeration
fn find_window_for_pid(pid: u32) -> Option<isize> {
    use windows::Win32::Foundation::{HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{EnumWindows, GetWindowThreadProcessId, IsWindowVisible};
    use windows::core::BOOL;

    struct Search {
        pid: u32,
        found: Option<isize>,
    }

    unsafe extern "system" fn callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let search = &mut *(lparam.0 as *mut Search);
            let mut owner = 0u32;
            GetWindowThreadProcessId(hwnd, Some(&mut owner));
            if owner == search.pid && IsWindowVisible(hwnd).as_bool() {
                search.found = Some(hwnd.0 as isize);
                return BOOL(0);
            }
            BOOL(1)
        }
    }

    let mut search = Search { pid, found: None };
    unsafe {
        // Stopping early makes EnumWindows report an error
        let _ = EnumWindows(Some(callback), LPARAM(&raw mut search as isize));
    }
    search.found
}

/// Pid of this process's parent
#[cfg(windows)]
pub fn parent_pid() -> Option<u32> {
    build_process_tree()
        .get(&std::process::id())
        .copied()
        .filter(|&parent| parent != 0)
}

/// Pid of this process's parent
#[cfg(unix)]
pub fn parent_pid() -> Option<u32> {
    Some(std::os::unix::process::parent_id())
}

/// Pid of this process's parent
#[cfg(not(any(windows, unix)))]
pub fn parent_pid() -> Option<u32> {
    None
}

/// No terminal lookup off Windows
#[cfg(not(windows))]
pub fn find_terminal_window(_pid: u32) -> Option<isize> {
    None
}

/// No window focusing off Windows
#[cfg(not(windows))]
pub fn focus_window(_hwnd: isize) -> bool {
    false
}

/// No windows off Windows
#[cfg(not(windows))]
pub fn is_window_valid(_hwnd: isize) -> bool {
    false
}
