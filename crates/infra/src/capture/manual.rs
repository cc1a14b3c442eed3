//! Manual paste-back capture
//!
//! For headless sessions: print the authorization URL, let the user finish
//! the login in any browser, and read back the redirect URL the browser
//! could not open. Validation is the same [`parse_redirect`] the automatic
//! path uses.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use schemeauth_core::{
    parse_redirect, CaptureRequest, CaptureStrategy, CapturedRedirect, RedirectCapture,
};
use schemeauth_domain::{AuthError, Result};
use tracing::{debug, info};

type SharedReader = Arc<Mutex<Box<dyn BufRead + Send>>>;
type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Prompt-driven [`RedirectCapture`]
#[derive(Clone)]
pub struct ManualRedirectCapture {
    input: SharedReader,
    output: SharedWriter,
}

impl ManualRedirectCapture {
    /// Read from stdin; prompts go to stderr so stdout stays scriptable.
    #[must_use]
    pub fn stdio() -> Self {
        Self::with_io(io::BufReader::new(io::stdin()), io::stderr())
    }

    #[must_use]
    pub fn with_io<R, W>(input: R, output: W) -> Self
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            input: Arc::new(Mutex::new(Box::new(input))),
            output: Arc::new(Mutex::new(Box::new(output))),
        }
    }

    /// Show the URL, wait for one pasted line and validate it.
    ///
    /// # Errors
    /// - `no_input` for an empty line or end of input
    /// - any [`parse_redirect`] error for the pasted text
    pub fn capture_blocking(&self, request: &CaptureRequest) -> Result<CapturedRedirect> {
        self.prompt(&request.auth_url)
            .map_err(|e| AuthError::Unexpected(format!("failed to write prompt: {e}")))?;

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_line(&mut line)
            .map_err(|e| AuthError::Unexpected(format!("failed to read redirect URL: {e}")))?;

        if read == 0 || line.trim().is_empty() {
            debug!("capture.manual_no_input");
            return Err(AuthError::NoInput);
        }

        info!(length = line.trim().len(), "capture.manual_received");
        parse_redirect(&line)
    }

    fn prompt(&self, auth_url: &str) -> io::Result<()> {
        let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out)?;
        writeln!(out, "Open this URL in a browser and sign in:")?;
        writeln!(out)?;
        writeln!(out, "  {auth_url}")?;
        writeln!(out)?;
        writeln!(out, "The browser will fail to open the redirect. Copy the full URL it tried")?;
        writeln!(out, "to open from the address bar or error page and paste it below.")?;
        write!(out, "Redirect URL: ")?;
        out.flush()
    }
}

#[async_trait]
impl RedirectCapture for ManualRedirectCapture {
    fn strategy(&self) -> CaptureStrategy {
        CaptureStrategy::Manual
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<CapturedRedirect> {
        let capture = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || capture.capture_blocking(&request))
            .await
            .map_err(|e| AuthError::Unexpected(format!("manual capture task failed: {e}")))?
    }
}
