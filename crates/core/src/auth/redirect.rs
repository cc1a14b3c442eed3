//! Redirect URL validation
//!
//! Both capture strategies funnel the raw redirect string through
//! [`parse_redirect`], so an automatic capture and a pasted URL are judged
//! by identical rules.

use schemeauth_domain::{AuthError, Result};
use url::Url;

use super::ports::CapturedRedirect;

const DEFAULT_ERROR_DESCRIPTION: &str = "Unknown error";

/// Parse a captured redirect URL into its authorization code and state.
///
/// Rules, in order:
/// - empty input → `NoInput`
/// - not an absolute URL → `Parse`
/// - `error` parameter present → `Provider` (description defaults to
///   "Unknown error")
/// - `code` missing or empty → `NoCode`
///
/// State is returned as-is; comparing it is the orchestrator's job.
///
/// # Errors
/// See the rules above.
pub fn parse_redirect(raw: &str) -> Result<CapturedRedirect> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::NoInput);
    }

    let url = Url::parse(trimmed).map_err(|e| AuthError::Parse(format!("{e}: {trimmed}")))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if code.is_none() => code = Some(value.into_owned()),
            "state" if state.is_none() => state = Some(value.into_owned()),
            "error" if error.is_none() => error = Some(value.into_owned()),
            "error_description" if error_description.is_none() => {
                error_description = Some(value.into_owned());
            }
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(AuthError::Provider {
            error,
            description: error_description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_ERROR_DESCRIPTION.to_string()),
        });
    }

    match code {
        Some(code) if !code.is_empty() => Ok(CapturedRedirect { code, state }),
        _ => Err(AuthError::NoCode),
    }
}
