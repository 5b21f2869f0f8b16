//! Build script to inject build-time information into the binary.
//!
//! Sets environment variables read at compile time:
//! - `WAKATIME_RUSTC_VERSION`: toolchain version embedded in the user agent

use std::process::Command;

fn main() {
    let rustc = get_rustc_version().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=WAKATIME_RUSTC_VERSION={}", rustc);
}

fn get_rustc_version() -> Option<String> {
    let output = Command::new("rustc").arg("--version").output().ok()?;

    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8(output.stdout).ok()?;
    // "rustc 1.79.0 (129f3b996 2024-06-10)" -> "rust/1.79.0"
    let number = version.split_whitespace().nth(1)?;
    Some(format!("rust/{}", number))
}
