//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for authorization without client secrets.
//! A fresh parameter set is generated for every login attempt.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Shortest verifier RFC 7636 accepts.
pub const VERIFIER_MIN_LEN: usize = 43;
/// Longest verifier RFC 7636 accepts.
pub const VERIFIER_MAX_LEN: usize = 128;
/// The only challenge method this crate produces.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

const VERIFIER_ENTROPY_BYTES: usize = 64;
const STATE_ENTROPY_BYTES: usize = 32;

/// Generate a cryptographically secure code verifier
///
/// 64 random bytes encoded as URL-safe base64 without padding (86
/// characters), truncated to the 128-character RFC limit.
#[must_use]
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut verifier = URL_SAFE_NO_PAD.encode(bytes);
    verifier.truncate(VERIFIER_MAX_LEN);
    verifier
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
#[must_use]
pub fn generate_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let hash = hasher.finalize();
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF protection
///
/// Hex encoding of 32 random bytes, independent of the PKCE pair.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Validate that the state token matches
///
/// Compares in constant time with respect to the contents.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    if expected.len() != actual.len() {
        return false;
    }
    expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// PKCE parameters for one authorization attempt
///
/// The verifier never leaves the process except in the token exchange
/// request; the challenge and state travel in the authorization URL.
#[derive(Debug, Clone)]
pub struct PkceParameters {
    /// Random string (43-128 chars, base64url encoded)
    pub verifier: String,

    /// SHA256 hash of the verifier (base64url encoded)
    pub challenge: String,

    /// Random CSRF protection token
    pub state: String,
}

impl PkceParameters {
    /// Generate a new parameter set
    ///
    /// # Examples
    /// ```
    /// use schemeauth_common::auth::pkce::PkceParameters;
    ///
    /// let pkce = PkceParameters::generate();
    /// assert!(pkce.verifier.len() >= 43);
    /// assert!(pkce.verifier.len() <= 128);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_verifier();
        let challenge = generate_challenge(&verifier);
        let state = generate_state();

        Self { verifier, challenge, state }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        CODE_CHALLENGE_METHOD
    }
}
