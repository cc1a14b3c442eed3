//! Driving the external capture helper
//!
//! One capture attempt:
//! 1. resolve the helper for this platform (fail fast if missing)
//! 2. prepare the handshake directory and args file
//! 3. register the URL scheme where the OS needs it (Linux, best-effort)
//! 4. launch the helper with piped output
//! 5. every poll tick, check the result file, then whether the helper
//!    exited (its stdout may carry a `CAPTURED_URL:` line)
//! 6. on timeout send SIGTERM, wait out the grace period, then kill
//! 7. remove the handshake files and parse whatever URL arrived
//!
//! Cancellation is authoritative: once termination starts, nothing the
//! helper writes is read.
//!
//! On Unix the helper leads its own process group. Signals go to the whole
//! group so processes it spawned cannot keep the output pipes open.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use schemeauth_core::{
    parse_redirect, CaptureRequest, CaptureStrategy, CapturedRedirect, RedirectCapture,
};
use schemeauth_domain::constants::CAPTURED_URL_MARKER;
use schemeauth_domain::{AuthError, CaptureConfig, Result};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use super::handshake::Handshake;
use super::locator::{CapturerSource, LaunchSpec};
use super::registration;

/// How long to wait for the helper's pipes to close after it exits
const OUTPUT_DRAIN_LIMIT: Duration = Duration::from_secs(2);
/// How long to wait for reader threads once the process group is gone
const READER_JOIN_LIMIT: Duration = Duration::from_millis(500);
/// Stderr lines quoted in a crash report
const STDERR_TAIL_LINES: usize = 5;

/// Automatic capture through the external helper process
#[derive(Debug, Clone)]
pub struct CaptureCoordinator {
    source: CapturerSource,
    handshake_dir: PathBuf,
    default_timeout: Duration,
    poll_interval: Duration,
    grace_period: Duration,
    register_scheme: bool,
}

impl CaptureCoordinator {
    #[must_use]
    pub fn new(source: CapturerSource, handshake_dir: impl Into<PathBuf>) -> Self {
        let defaults = CaptureConfig::default();
        Self {
            source,
            handshake_dir: handshake_dir.into(),
            default_timeout: defaults.timeout(),
            poll_interval: defaults.poll_interval(),
            grace_period: defaults.grace_period(),
            register_scheme: defaults.register_scheme,
        }
    }

    #[must_use]
    pub fn from_config(capture: &CaptureConfig) -> Self {
        Self {
            source: CapturerSource::from_config(capture),
            handshake_dir: capture.handshake_dir.clone(),
            default_timeout: capture.timeout(),
            poll_interval: capture.poll_interval(),
            grace_period: capture.grace_period(),
            register_scheme: capture.register_scheme,
        }
    }

    /// Timeout used when the request does not carry one
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    #[must_use]
    pub const fn with_scheme_registration(mut self, enabled: bool) -> Self {
        self.register_scheme = enabled;
        self
    }

    pub fn source(&self) -> &CapturerSource {
        &self.source
    }

    pub fn handshake_dir(&self) -> &Path {
        &self.handshake_dir
    }

    /// Run one capture attempt on the current thread.
    ///
    /// # Errors
    /// - locator errors (`capturer_unavailable`, `app_not_found`,
    ///   `executable_not_found`, `unsupported_platform`) before launch
    /// - `no_redirect` on timeout or when the helper exits cleanly without
    ///   a URL
    /// - `capturer_crashed` when it exits with a failure status
    /// - redirect validation errors for the captured URL
    pub fn capture_blocking(&self, request: &CaptureRequest) -> Result<CapturedRedirect> {
        let launch = self.source.resolve()?;
        let scheme = url_scheme(&request.redirect_uri).ok_or_else(|| {
            AuthError::Config(format!("redirect_uri has no URL scheme: {}", request.redirect_uri))
        })?;
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let handshake = Handshake::prepare(&self.handshake_dir, scheme, &request.auth_url)
            .map_err(|e| {
                AuthError::Unexpected(format!(
                    "failed to prepare capture handshake in {}: {e}",
                    self.handshake_dir.display()
                ))
            })?;

        if self.register_scheme {
            registration::ensure_registered(scheme, &launch.program);
        }

        let outcome = self.supervise(&launch, &handshake, timeout);
        drop(handshake);

        parse_redirect(&outcome?)
    }

    /// Launch the helper and wait for a URL, an exit or the deadline.
    fn supervise(
        &self,
        launch: &LaunchSpec,
        handshake: &Handshake,
        timeout: Duration,
    ) -> Result<String> {
        let mut command = Command::new(&launch.program);
        command
            .args(&launch.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn().map_err(|e| launch_error(&launch.program, &e))?;

        let pid = child.id();
        info!(
            pid,
            program = %launch.program.display(),
            timeout_secs = timeout.as_secs(),
            "capture.launched"
        );
        let output = OutputDrain::attach(&mut child);
        let started = Instant::now();

        loop {
            if let Some(url) = handshake.read_result() {
                info!(pid, elapsed_ms = started.elapsed().as_millis(), "capture.result_file");
                self.terminate(&mut child);
                output.finish(pid);
                return Ok(url);
            }

            match child.try_wait() {
                Ok(Some(status)) => return finish_exited(status, pid, handshake, output),
                Ok(None) => {}
                Err(e) => {
                    self.terminate(&mut child);
                    output.finish(pid);
                    return Err(AuthError::Unexpected(format!(
                        "failed to poll capture helper: {e}"
                    )));
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                break;
            }
            thread::sleep(self.poll_interval.min(timeout - elapsed));
        }

        warn!(pid, timeout_secs = timeout.as_secs(), "capture.timed_out");
        self.terminate(&mut child);
        output.finish(pid);
        Err(AuthError::NoRedirect(format!(
            "Did not receive redirect within {}s",
            timeout.as_secs()
        )))
    }

    /// SIGTERM, then SIGKILL after the grace period. Returns once the child
    /// has been reaped.
    fn terminate(&self, child: &mut Child) {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }

        request_terminate(child);
        match child.wait_timeout(self.grace_period) {
            Ok(Some(status)) => debug!(pid = child.id(), %status, "capture.terminated"),
            Ok(None) => {
                warn!(
                    pid = child.id(),
                    grace_secs = self.grace_period.as_secs(),
                    "capture.force_killed"
                );
                force_kill(child);
            }
            Err(e) => {
                warn!(pid = child.id(), error = %e, "capture.wait_failed");
                force_kill(child);
            }
        }
    }
}

#[async_trait]
impl RedirectCapture for CaptureCoordinator {
    fn strategy(&self) -> CaptureStrategy {
        CaptureStrategy::Automatic
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<CapturedRedirect> {
        let coordinator = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || coordinator.capture_blocking(&request))
            .await
            .map_err(|e| AuthError::Unexpected(format!("capture task failed: {e}")))?
    }
}

/// The helper exited on its own: take the result file, then the stdout
/// marker, else classify the exit.
fn finish_exited(
    status: ExitStatus,
    pid: u32,
    handshake: &Handshake,
    output: OutputDrain,
) -> Result<String> {
    if let Some(url) = handshake.read_result() {
        info!(%status, "capture.result_file");
        output.finish(pid);
        return Ok(url);
    }

    let captured = output.collect(OUTPUT_DRAIN_LIMIT);
    output.finish(pid);
    if let Some(url) = captured.marked_url() {
        info!(%status, "capture.stdout_marker");
        return Ok(url);
    }

    if status.success() {
        warn!(%status, "capture.exited_without_redirect");
        return Err(AuthError::NoRedirect(
            "Capture helper exited without reporting a redirect".to_string(),
        ));
    }

    let tail = captured.stderr_tail(STDERR_TAIL_LINES);
    warn!(%status, stderr = %tail, "capture.crashed");
    Err(AuthError::CapturerCrashed(if tail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {tail}")
    }))
}

fn launch_error(program: &Path, err: &std::io::Error) -> AuthError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AuthError::ExecutableNotFound(program.display().to_string())
    } else {
        AuthError::Unexpected(format!("failed to launch {}: {err}", program.display()))
    }
}

#[cfg(unix)]
fn request_terminate(child: &mut Child) {
    let pid = child.id();
    match signal_group(pid, "-TERM") {
        Ok(status) if status.success() => debug!(pid, "capture.sigterm_sent"),
        Ok(status) => warn!(pid, %status, "capture.sigterm_failed"),
        Err(e) => {
            warn!(pid, error = %e, "capture.sigterm_failed");
            force_kill(child);
        }
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    force_kill(child);
}

/// Send `signal` to every process in the group led by `pid`.
#[cfg(unix)]
fn signal_group(pid: u32, signal: &str) -> std::io::Result<ExitStatus> {
    Command::new("kill")
        .args([signal, "--", &format!("-{pid}")])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}

/// Kill whatever is left of the helper's process group.
#[cfg(unix)]
fn kill_group(pid: u32) {
    if let Err(e) = signal_group(pid, "-KILL") {
        debug!(pid, error = %e, "capture.group_kill_failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

fn force_kill(child: &mut Child) {
    kill_group(child.id());
    if let Err(e) = child.kill() {
        debug!(pid = child.id(), error = %e, "capture.kill_failed");
    }
    if let Err(e) = child.wait() {
        warn!(pid = child.id(), error = %e, "capture.reap_failed");
    }
}

/// Text before `://`, if non-empty.
fn url_scheme(redirect_uri: &str) -> Option<&str> {
    redirect_uri.split_once("://").map(|(scheme, _)| scheme).filter(|s| !s.is_empty())
}

enum StreamLine {
    Stdout(String),
    Stderr(String),
}

/// Background readers keeping the helper's pipes drained
struct OutputDrain {
    rx: Receiver<StreamLine>,
    readers: Vec<JoinHandle<()>>,
}

impl OutputDrain {
    fn attach(child: &mut Child) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone(), StreamLine::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx, StreamLine::Stderr));
        }
        Self { rx, readers }
    }

    /// Everything read so far plus whatever arrives before both pipes close
    /// or `limit` passes. A grandchild holding the pipes open cannot stall
    /// the caller past `limit`.
    fn collect(&self, limit: Duration) -> CapturedOutput {
        let deadline = Instant::now() + limit;
        let mut output = CapturedOutput::default();
        while let Ok(line) =
            self.rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        {
            match line {
                StreamLine::Stdout(line) => output.stdout.push(line),
                StreamLine::Stderr(line) => output.stderr.push(line),
            }
        }
        output
    }

    /// Join the reader threads. Readers still blocked mean something in the
    /// helper's process group holds the pipes; that group is killed first
    /// and the wait is bounded.
    fn finish(self, pid: u32) {
        if self.readers.iter().any(|reader| !reader.is_finished()) {
            debug!(pid, "capture.output_held_open");
            kill_group(pid);
        }

        let deadline = Instant::now() + READER_JOIN_LIMIT;
        while self.readers.iter().any(|reader| !reader.is_finished()) && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(10));
        }

        let mut detached = 0;
        for reader in self.readers {
            if reader.is_finished() {
                let _ = reader.join();
            } else {
                detached += 1;
            }
        }
        if detached > 0 {
            warn!(pid, detached, "capture.output_readers_detached");
        }
    }
}

fn spawn_reader<R>(
    reader: R,
    tx: Sender<StreamLine>,
    wrap: fn(String) -> StreamLine,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    })
}

#[derive(Debug, Default)]
struct CapturedOutput {
    stdout: Vec<String>,
    stderr: Vec<String>,
}

impl CapturedOutput {
    fn marked_url(&self) -> Option<String> {
        self.stdout.iter().find_map(|line| {
            line.trim()
                .strip_prefix(CAPTURED_URL_MARKER)
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
        })
    }

    fn stderr_tail(&self, lines: usize) -> String {
        let start = self.stderr.len().saturating_sub(lines);
        self.stderr[start..]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
