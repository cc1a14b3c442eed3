//! Integration tests for the capture coordinator
//!
//! Each test stands in a `/bin/sh -c` script for the capture helper. The
//! handshake directory is passed to the script as `$1`.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use schemeauth_core::{CaptureRequest, CaptureStrategy, RedirectCapture};
use schemeauth_domain::constants::{ARGS_FILE_NAME, RESULT_FILE_NAME};
use schemeauth_infra::{CaptureCoordinator, CapturerSource};
use tempfile::TempDir;

const AUTH_URL: &str = "https://idp.example/authorize?client_id=cli&state=S1";

struct Fixture {
    _temp: TempDir,
    handshake_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let handshake_dir = temp.path().join("oauth");
        Self { _temp: temp, handshake_dir }
    }

    fn coordinator(&self, script: &str) -> CaptureCoordinator {
        let source = CapturerSource::Command {
            program: PathBuf::from("/bin/sh"),
            args: vec![
                "-c".to_string(),
                script.to_string(),
                "capture-helper".to_string(),
                self.handshake_dir.display().to_string(),
            ],
        };
        self.with_source(source)
    }

    fn with_source(&self, source: CapturerSource) -> CaptureCoordinator {
        CaptureCoordinator::new(source, &self.handshake_dir)
            .with_poll_interval(Duration::from_millis(50))
            .with_grace_period(Duration::from_secs(1))
            .with_scheme_registration(false)
    }

    fn assert_handshake_clean(&self) {
        assert!(!self.handshake_dir.join(ARGS_FILE_NAME).exists(), "args file left behind");
        assert!(!self.handshake_dir.join(RESULT_FILE_NAME).exists(), "result file left behind");
    }

    fn path(&self, name: &str) -> PathBuf {
        self.handshake_dir.join(name)
    }
}

fn request(timeout_secs: u64) -> CaptureRequest {
    CaptureRequest {
        auth_url: AUTH_URL.to_string(),
        redirect_uri: "myapp://callback".to_string(),
        timeout: Some(Duration::from_secs(timeout_secs)),
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn process_alive(pid: &str) -> bool {
    std::process::Command::new("kill")
        .args(["-0", pid])
        .stderr(std::process::Stdio::null())
        .status()
        .unwrap()
        .success()
}

/// Wait for a background process started by a fake helper to disappear.
fn assert_exits_soon(pid_file: &Path) {
    let pid = read(pid_file).trim().to_string();
    let deadline = Instant::now() + Duration::from_secs(3);
    while process_alive(&pid) {
        assert!(Instant::now() < deadline, "process {pid} outlived the capture");
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Validates the primary channel: the helper writes the result file.
///
/// # Test Steps
/// 1. Helper copies the args file aside, writes a redirect, keeps running
/// 2. Coordinator returns the code and terminates the helper
/// 3. Args payload was camelCase and both handshake files are gone
#[test]
fn test_result_file_is_captured() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator(
        r#"cp "$1/args.json" "$1/seen-args.json"
sleep 0.2
printf 'myapp://callback?code=abc123&state=S1' > "$1/result.txt"
exec sleep 30"#,
    );

    let captured = coordinator.capture_blocking(&request(10)).unwrap();

    assert_eq!(captured.code, "abc123");
    assert_eq!(captured.state.as_deref(), Some("S1"));

    let args: serde_json::Value =
        serde_json::from_str(&read(&fixture.path("seen-args.json"))).unwrap();
    assert_eq!(args["urlScheme"], "myapp");
    assert_eq!(args["authUrl"], AUTH_URL);
    fixture.assert_handshake_clean();
}

#[test]
fn test_stdout_marker_is_secondary_channel() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator(
        r"echo 'opening browser'
echo 'CAPTURED_URL:myapp://callback?code=fromstdout&state=S1'
exit 0",
    );

    let captured = coordinator.capture_blocking(&request(10)).unwrap();

    assert_eq!(captured.code, "fromstdout");
    fixture.assert_handshake_clean();
}

#[test]
fn test_result_file_written_just_before_exit() {
    let fixture = Fixture::new();
    let coordinator =
        fixture.coordinator(r#"printf 'myapp://callback?code=quick&state=S1' > "$1/result.txt""#);

    let captured = coordinator.capture_blocking(&request(10)).unwrap();

    assert_eq!(captured.code, "quick");
    fixture.assert_handshake_clean();
}

/// Validates the timeout property.
///
/// # Test Steps
/// 1. Helper never reports anything
/// 2. Coordinator gives up after the request timeout
/// 3. Failure is `no_redirect` and the handshake is clean
#[test]
fn test_timeout_is_no_redirect() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator("exec sleep 30");

    let started = Instant::now();
    let err = coordinator.capture_blocking(&request(1)).unwrap_err();

    assert_eq!(err.kind(), "no_redirect");
    assert!(err.to_string().contains("within 1s"));
    assert!(started.elapsed() < Duration::from_secs(10));
    fixture.assert_handshake_clean();
}

/// A result written in response to SIGTERM arrives after cancellation began
/// and must not be honored.
#[test]
fn test_result_after_cancellation_is_ignored() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator(
        r#"trap 'printf "myapp://callback?code=late&state=S1" > "$1/result.txt"; exit 0' TERM
while :; do sleep 0.1; done"#,
    );

    let err = coordinator.capture_blocking(&request(1)).unwrap_err();

    assert_eq!(err.kind(), "no_redirect");
    fixture.assert_handshake_clean();
}

#[test]
fn test_helper_ignoring_sigterm_is_killed() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator(
        r"trap '' TERM
while :; do sleep 0.1; done",
    );

    let started = Instant::now();
    let err = coordinator.capture_blocking(&request(1)).unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.kind(), "no_redirect");
    // timeout plus the one-second grace period
    assert!(elapsed >= Duration::from_secs(2), "returned before grace period: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10));
    fixture.assert_handshake_clean();
}

/// A process the helper leaves behind holds the output pipes open.
///
/// # Test Steps
/// 1. Helper starts a background `sleep` sharing its stdout and stderr
/// 2. Coordinator times out and terminates the helper's process group
/// 3. The background process is gone and the call returns promptly
#[test]
fn test_timeout_tears_down_processes_holding_output() {
    let fixture = Fixture::new();
    let pid_file = fixture.handshake_dir.with_file_name("background.pid");
    let coordinator = fixture.coordinator(&format!(
        r#"sleep 30 &
echo $! > "{}"
exec sleep 30"#,
        pid_file.display()
    ));

    let started = Instant::now();
    let err = coordinator.capture_blocking(&request(1)).unwrap_err();

    assert_eq!(err.kind(), "no_redirect");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_exits_soon(&pid_file);
    fixture.assert_handshake_clean();
}

#[test]
fn test_crash_with_background_process_still_reports_stderr() {
    let fixture = Fixture::new();
    let pid_file = fixture.handshake_dir.with_file_name("background.pid");
    let coordinator = fixture.coordinator(&format!(
        r#"sleep 30 &
echo $! > "{}"
echo 'renderer failed' >&2
exit 4"#,
        pid_file.display()
    ));

    let started = Instant::now();
    let err = coordinator.capture_blocking(&request(10)).unwrap_err();

    assert_eq!(err.kind(), "capturer_crashed");
    assert!(err.to_string().contains("renderer failed"));
    assert!(started.elapsed() < Duration::from_secs(6));
    assert_exits_soon(&pid_file);
    fixture.assert_handshake_clean();
}

#[test]
fn test_failing_exit_is_crash_with_stderr() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator(
        r"echo 'display connection refused' >&2
exit 3",
    );

    let err = coordinator.capture_blocking(&request(10)).unwrap_err();

    assert_eq!(err.kind(), "capturer_crashed");
    assert!(err.to_string().contains("display connection refused"));
    fixture.assert_handshake_clean();
}

#[test]
fn test_clean_exit_without_url_is_no_redirect() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator("echo 'window closed'; exit 0");

    let err = coordinator.capture_blocking(&request(10)).unwrap_err();

    assert_eq!(err.kind(), "no_redirect");
    fixture.assert_handshake_clean();
}

#[test]
fn test_provider_error_in_result_file() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator(
        r#"printf 'myapp://callback?error=access_denied&error_description=User+declined' > "$1/result.txt"
exec sleep 30"#,
    );

    let err = coordinator.capture_blocking(&request(10)).unwrap_err();

    assert_eq!(err.kind(), "access_denied");
    assert_eq!(err.description(), "User declined");
    fixture.assert_handshake_clean();
}

#[test]
fn test_stale_result_from_previous_run_is_discarded() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(&fixture.handshake_dir).unwrap();
    std::fs::write(fixture.path(RESULT_FILE_NAME), "myapp://callback?code=stale").unwrap();
    let coordinator = fixture.coordinator("exit 0");

    let err = coordinator.capture_blocking(&request(10)).unwrap_err();

    assert_eq!(err.kind(), "no_redirect");
    fixture.assert_handshake_clean();
}

#[test]
fn test_missing_packaged_helper_fails_before_launch() {
    let fixture = Fixture::new();
    let empty_root = fixture.handshake_dir.with_file_name("helper-root");
    let coordinator = fixture.with_source(CapturerSource::Packaged {
        root: empty_root,
        app_name: "Capture".to_string(),
    });

    let err = coordinator.capture_blocking(&request(10)).unwrap_err();

    assert!(
        matches!(err.kind(), "capturer_unavailable" | "unsupported_platform"),
        "unexpected kind {}",
        err.kind()
    );
    assert!(!fixture.handshake_dir.exists(), "handshake prepared for a missing helper");
}

#[test]
fn test_missing_executable() {
    let fixture = Fixture::new();

    let absolute = fixture.with_source(CapturerSource::Command {
        program: PathBuf::from("/nonexistent/capture-helper"),
        args: vec![],
    });
    assert_eq!(absolute.capture_blocking(&request(10)).unwrap_err().kind(), "executable_not_found");

    let on_path = fixture.with_source(CapturerSource::Command {
        program: PathBuf::from("schemeauth-no-such-capture-helper"),
        args: vec![],
    });
    assert_eq!(on_path.capture_blocking(&request(10)).unwrap_err().kind(), "executable_not_found");
    fixture.assert_handshake_clean();
}

#[test]
fn test_redirect_uri_without_scheme_is_config_error() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator("exit 0");
    let mut bad = request(10);
    bad.redirect_uri = "callback".to_string();

    assert_eq!(coordinator.capture_blocking(&bad).unwrap_err().kind(), "config_error");
}

#[tokio::test]
async fn test_async_port_runs_off_the_runtime() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator(
        r#"printf 'myapp://callback?code=async&state=S1' > "$1/result.txt"
exec sleep 30"#,
    );

    assert_eq!(coordinator.strategy(), CaptureStrategy::Automatic);
    let captured = coordinator.capture(&request(10)).await.unwrap();

    assert_eq!(captured.code, "async");
    fixture.assert_handshake_clean();
}
