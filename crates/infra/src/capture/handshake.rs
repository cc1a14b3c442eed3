//! File handshake with the external capturer
//!
//! The helper reads `args.json` (`{"urlScheme", "authUrl"}`) on start and
//! writes the captured redirect URL as plain text to `result.txt`. Both
//! files live in a private directory and are removed when the
//! [`Handshake`] is dropped, so no attempt can observe a previous one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use schemeauth_domain::constants::{ARGS_FILE_NAME, RESULT_FILE_NAME};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// Payload of the args file, as the helper expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeArgs {
    pub url_scheme: String,
    pub auth_url: String,
}

/// One capture attempt's handshake files.
///
/// Cleanup runs on drop; [`Handshake::cleanup`] can also be called early.
#[derive(Debug)]
pub struct Handshake {
    dir: PathBuf,
    args_path: PathBuf,
    result_path: PathBuf,
}

impl Handshake {
    /// Create the directory (owner-only), drop any stale result and write
    /// the args file (owner-only).
    ///
    /// # Errors
    /// Returns the underlying I/O error if the directory or file cannot be
    /// written.
    pub fn prepare(dir: &Path, url_scheme: &str, auth_url: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        restrict(dir, 0o700)?;

        let handshake = Self {
            dir: dir.to_path_buf(),
            args_path: dir.join(ARGS_FILE_NAME),
            result_path: dir.join(RESULT_FILE_NAME),
        };

        remove_if_present(&handshake.result_path)?;

        let args = HandshakeArgs {
            url_scheme: url_scheme.to_string(),
            auth_url: auth_url.to_string(),
        };
        let payload = serde_json::to_vec(&args).map_err(io::Error::other)?;
        write_private(&handshake.args_path, &payload)?;

        debug!(dir = %handshake.dir.display(), url_scheme, "capture.handshake_prepared");
        Ok(handshake)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn args_path(&self) -> &Path {
        &self.args_path
    }

    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    /// The captured URL, once the helper has written a complete one.
    ///
    /// A result counts only when its query carries `code` or `error`; a
    /// half-written or unrelated file is ignored until the next poll.
    pub fn read_result(&self) -> Option<String> {
        let contents = fs::read_to_string(&self.result_path).ok()?;
        let candidate = contents.trim();
        is_redirect_result(candidate).then(|| candidate.to_string())
    }

    /// Remove both handshake files. Missing files are not an error.
    pub fn cleanup(&self) {
        for path in [&self.args_path, &self.result_path] {
            if let Err(e) = remove_if_present(path) {
                warn!(path = %path.display(), error = %e, "capture.handshake_cleanup_failed");
            }
        }
    }
}

impl Drop for Handshake {
    fn drop(&mut self) {
        self.cleanup();
        debug!(dir = %self.dir.display(), "capture.handshake_cleaned");
    }
}

fn is_redirect_result(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    url.query_pairs().any(|(key, _)| key == "code" || key == "error")
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    // `mode` only applies on creation; tighten a pre-existing file too
    restrict(path, 0o600)
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
