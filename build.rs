fn main() {
    // Embed Windows version info
    #[cfg(windows)]
    {
        let mut res = winres::WindowsResource::new();
        res.set("ProductName", "Claude Notch");
        res.set("FileDescription", "Claude Code activity tray companion");
        res.set("CompanyName", "claude-notch contributors");
        res.set("OriginalFilename", "claude-notch.exe");
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));
        if let Err(e) = res.compile() {
            println!("cargo:warning=Failed to embed Windows resources: {e}");
        }
    }
}
