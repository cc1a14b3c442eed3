//! Custom URL scheme registration (Linux)
//!
//! Desktop environments on Linux route `<scheme>://` URLs through a
//! `.desktop` entry declaring `MimeType=x-scheme-handler/<scheme>`. The
//! packaged helper does not install one itself, so it is written here before
//! every launch. Any failure is logged and ignored; an entry from an earlier
//! run may still be in place.

use std::path::Path;

use tracing::debug;

/// Contents of the `.desktop` entry routing `scheme` to `executable`.
#[must_use]
pub fn desktop_entry(scheme: &str, executable: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name=SchemeAuth Capture ({scheme})\n\
         Exec={} %u\n\
         Terminal=false\n\
         NoDisplay=true\n\
         MimeType=x-scheme-handler/{scheme};\n",
        quote_exec(&executable.display().to_string()),
    )
}

/// File name of the entry; characters outside `[A-Za-z0-9_-]` become `-`.
#[must_use]
pub fn desktop_file_name(scheme: &str) -> String {
    let safe: String = scheme
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("schemeauth-{safe}.desktop")
}

/// Register `executable` as the handler for `scheme`. Never fails.
pub fn ensure_registered(scheme: &str, executable: &Path) {
    #[cfg(target_os = "linux")]
    {
        match linux::register(scheme, executable) {
            Ok(entry) => debug!(scheme, entry = %entry.display(), "capture.scheme_registered"),
            Err(e) => tracing::warn!(scheme, error = %e, "capture.scheme_registration_failed"),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = executable;
        debug!(scheme, "capture.scheme_registration_skipped");
    }
}

/// Quote a path for an `Exec=` key: reserved characters are escaped inside
/// double quotes.
fn quote_exec(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(target_os = "linux")]
mod linux {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::process::Command;

    use tracing::warn;

    use super::{desktop_entry, desktop_file_name};

    pub(super) fn register(scheme: &str, executable: &Path) -> io::Result<PathBuf> {
        let applications = dirs::data_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no user data directory"))?
            .join("applications");
        fs::create_dir_all(&applications)?;

        let file_name = desktop_file_name(scheme);
        let entry = applications.join(&file_name);
        fs::write(&entry, desktop_entry(scheme, executable))?;

        let mime = format!("x-scheme-handler/{scheme}");
        run("xdg-mime", &["default", file_name.as_str(), mime.as_str()]);
        run("update-desktop-database", &[&applications.display().to_string()]);

        Ok(entry)
    }

    /// Run a desktop tool; a missing tool or non-zero exit only warns.
    fn run(program: &str, args: &[&str]) {
        match Command::new(program).args(args).output() {
            Ok(output) if output.status.success() => {}
            Ok(output) => warn!(
                program,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "capture.scheme_tool_failed"
            ),
            Err(e) => warn!(program, error = %e, "capture.scheme_tool_unavailable"),
        }
    }
}
