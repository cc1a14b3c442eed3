//! Display detection
//!
//! Linux sessions without `DISPLAY` or `WAYLAND_DISPLAY` (SSH, containers,
//! CI) cannot open a browser, so login falls back to the paste prompt.
//! macOS and Windows are assumed to always have a desktop.

use std::ffi::OsString;

const DISPLAY_VARS: [&str; 2] = ["DISPLAY", "WAYLAND_DISPLAY"];

/// Whether the current process has no usable display.
#[must_use]
pub fn detect_headless() -> bool {
    let headless = headless_from(std::env::consts::OS, |key| std::env::var_os(key));
    tracing::debug!(headless, "platform.display_probe");
    headless
}

/// [`detect_headless`] for a given OS name and environment lookup.
pub fn headless_from<F>(os: &str, lookup: F) -> bool
where
    F: Fn(&str) -> Option<OsString>,
{
    if os != "linux" {
        return false;
    }
    DISPLAY_VARS.iter().all(|key| lookup(key).map_or(true, |value| value.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<OsString> {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| OsString::from(v))
    }

    #[test]
    fn test_linux_without_display_is_headless() {
        assert!(headless_from("linux", env(&[])));
        assert!(headless_from("linux", env(&[("DISPLAY", "")])));
    }

    #[test]
    fn test_linux_with_x11_or_wayland() {
        assert!(!headless_from("linux", env(&[("DISPLAY", ":0")])));
        assert!(!headless_from("linux", env(&[("WAYLAND_DISPLAY", "wayland-0")])));
    }

    #[test]
    fn test_other_platforms_assume_display() {
        assert!(!headless_from("macos", env(&[])));
        assert!(!headless_from("windows", env(&[])));
    }
}
