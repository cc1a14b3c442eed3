//! Authorization URL composition
//!
//! Pure functions, no network access. Query values are percent-encoded by
//! `url`'s form serializer.

use url::Url;

use super::pkce::{PkceParameters, CODE_CHALLENGE_METHOD};

/// One authorization request, immutable once built into a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    /// Space-separated scopes
    pub scope: String,
    pub code_challenge: String,
    pub state: String,
}

impl AuthorizationRequest {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
        pkce: &PkceParameters,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: scope.into(),
            code_challenge: pkce.challenge.clone(),
            state: pkce.state.clone(),
        }
    }

    /// Compose the provider authorization URL for this request.
    ///
    /// # Errors
    /// Returns `url::ParseError` if `authorize_url` is not an absolute URL.
    pub fn to_url(&self, authorize_url: &str) -> Result<Url, url::ParseError> {
        build_authorization_url(
            authorize_url,
            &self.client_id,
            &self.redirect_uri,
            &self.scope,
            &self.code_challenge,
            &self.state,
        )
    }
}

/// Build the authorization URL with the fixed PKCE query parameters.
///
/// Existing query parameters on `authorize_url` are preserved.
///
/// # Errors
/// Returns `url::ParseError` if `authorize_url` is not an absolute URL.
pub fn build_authorization_url(
    authorize_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &str,
    challenge: &str,
    state: &str,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(authorize_url)?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", scopes)
        .append_pair("response_type", "code")
        .append_pair("state", state)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);
    Ok(url)
}
