//! Locating the capture helper for the current platform
//!
//! The helper ships as one packaged build per platform under a common root:
//!
//! - macOS: `<app>-darwin-universal`, then `-darwin-arm64`, then
//!   `-darwin-x64`; executable `<app>.app/Contents/MacOS/<app>`
//! - Linux: `<app>-linux-arm64` (aarch64 only), then `<app>-linux-x64`;
//!   executable `<app>`
//! - Windows: `<app>-win32-x64`; executable `<app>.exe`
//!
//! An explicit executable from configuration bypasses the table.

use std::path::{Path, PathBuf};

use schemeauth_domain::constants::DEFAULT_CAPTURER_DIR_NAME;
use schemeauth_domain::{AuthError, CaptureConfig, Result};
use tracing::debug;

/// Operating system and CPU architecture to resolve the helper for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    /// `std::env::consts::OS` naming (`macos`, `linux`, `windows`)
    pub os: String,
    /// `std::env::consts::ARCH` naming (`x86_64`, `aarch64`)
    pub arch: String,
}

impl HostPlatform {
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self { os: os.into(), arch: arch.into() }
    }

    fn is_arm64(&self) -> bool {
        matches!(self.arch.as_str(), "aarch64" | "arm64")
    }
}

/// A resolved command ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Where the capture helper comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturerSource {
    /// Per-platform build below `root`, looked up through the layout table
    Packaged { root: PathBuf, app_name: String },
    /// A fixed command; a bare program name is looked up on `PATH` at spawn
    Command { program: PathBuf, args: Vec<String> },
}

impl CapturerSource {
    #[must_use]
    pub fn from_config(capture: &CaptureConfig) -> Self {
        match &capture.capturer_executable {
            Some(program) => Self::Command { program: program.clone(), args: Vec::new() },
            None => Self::Packaged {
                root: capture.capturer_dir.clone().unwrap_or_else(default_capturer_root),
                app_name: capture.capturer_app.clone(),
            },
        }
    }

    /// Resolve the helper for the running platform.
    ///
    /// # Errors
    /// See [`CapturerSource::resolve_for`].
    pub fn resolve(&self) -> Result<LaunchSpec> {
        self.resolve_for(&HostPlatform::current())
    }

    /// Resolve the helper for `platform` without launching anything.
    ///
    /// # Errors
    /// - `UnsupportedPlatform` when no packaged layout exists for the OS
    /// - `CapturerUnavailable` when no build for the platform is installed
    /// - `AppNotFound` when a macOS build lacks its `.app` bundle
    /// - `ExecutableNotFound` when the build or explicit path has no
    ///   executable
    pub fn resolve_for(&self, platform: &HostPlatform) -> Result<LaunchSpec> {
        match self {
            Self::Command { program, args } => {
                if has_path_component(program) && !program.is_file() {
                    return Err(AuthError::ExecutableNotFound(program.display().to_string()));
                }
                Ok(LaunchSpec { program: program.clone(), args: args.clone() })
            }
            Self::Packaged { root, app_name } => resolve_packaged(root, app_name, platform),
        }
    }

    /// Human-readable readiness report.
    ///
    /// # Errors
    /// The resolution error, whose message carries the remediation text.
    pub fn check_ready(&self) -> Result<String> {
        let launch = self.resolve()?;
        Ok(format!("Capture helper ready: {}", launch.program.display()))
    }
}

/// `<dir of the running binary>/capture-helper`, or the working directory's
/// when the binary path is unknown.
#[must_use]
pub fn default_capturer_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
        .join(DEFAULT_CAPTURER_DIR_NAME)
}

fn resolve_packaged(root: &Path, app_name: &str, platform: &HostPlatform) -> Result<LaunchSpec> {
    let candidates = platform_dirs(app_name, platform).ok_or_else(|| {
        AuthError::UnsupportedPlatform(format!("{}/{}", platform.os, platform.arch))
    })?;

    let Some(build_dir) =
        candidates.iter().map(|name| root.join(name)).find(|dir| dir.is_dir())
    else {
        return Err(AuthError::CapturerUnavailable(remediation(root, &candidates, platform)));
    };
    debug!(build_dir = %build_dir.display(), "capture.helper_located");

    let program = match platform.os.as_str() {
        "macos" => {
            let bundle = build_dir.join(format!("{app_name}.app"));
            if !bundle.is_dir() {
                return Err(AuthError::AppNotFound(bundle.display().to_string()));
            }
            bundle.join("Contents").join("MacOS").join(app_name)
        }
        "windows" => build_dir.join(format!("{app_name}.exe")),
        _ => build_dir.join(app_name),
    };

    if !program.is_file() {
        return Err(AuthError::ExecutableNotFound(program.display().to_string()));
    }
    Ok(LaunchSpec { program, args: Vec::new() })
}

fn platform_dirs(app_name: &str, platform: &HostPlatform) -> Option<Vec<String>> {
    let dirs = match platform.os.as_str() {
        "macos" => vec![
            format!("{app_name}-darwin-universal"),
            format!("{app_name}-darwin-arm64"),
            format!("{app_name}-darwin-x64"),
        ],
        "linux" if platform.is_arm64() => {
            vec![format!("{app_name}-linux-arm64"), format!("{app_name}-linux-x64")]
        }
        "linux" => vec![format!("{app_name}-linux-x64")],
        "windows" => vec![format!("{app_name}-win32-x64")],
        _ => return None,
    };
    Some(dirs)
}

fn remediation(root: &Path, candidates: &[String], platform: &HostPlatform) -> String {
    let expected = candidates.first().cloned().unwrap_or_default();
    format!(
        "no build for {}/{} under {}. Package the capture helper into {} \
         or set capturer_executable to an installed helper.",
        platform.os,
        platform.arch,
        root.display(),
        root.join(expected).display(),
    )
}

fn has_path_component(program: &Path) -> bool {
    program.components().count() > 1 || program.is_absolute()
}
