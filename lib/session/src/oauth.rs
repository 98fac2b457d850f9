//! Transient OAuth state and the identity-provider capability.
//!
//! Sign-in uses the authorization-code flow with PKCE. The `state` value and
//! the code verifier are generated here, handed to the browser in
//! short-lived cookies, and must come back exactly once on the callback.

use async_trait::async_trait;
use oauth2::{CsrfToken, PkceCodeChallenge};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::fmt;

use crate::error::SessionError;

/// Cookie holding the OAuth `state` value.
pub const STATE_COOKIE: &str = "google_oauth_state";

/// Cookie holding the PKCE code verifier.
pub const CODE_VERIFIER_COOKIE: &str = "google_code_verifier";

/// Lifetime of the transient sign-in cookies, in minutes.
pub const TRANSIENT_COOKIE_MINUTES: i64 = 10;

/// Scopes requested from Google.
pub const GOOGLE_SCOPES: &[&str] = &["openid", "profile"];

/// Random bytes behind each `state` value and code verifier.
const RANDOM_VALUE_BYTES: u32 = 32;

/// Generates a random OAuth `state` value (base64url, 43 characters).
#[must_use]
pub fn generate_state() -> String {
    CsrfToken::new_random_len(RANDOM_VALUE_BYTES).into_secret()
}

/// Generates a random PKCE code verifier (43 characters, within RFC 7636 bounds).
#[must_use]
pub fn generate_code_verifier() -> String {
    let (_, verifier) = PkceCodeChallenge::new_random_sha256_len(RANDOM_VALUE_BYTES);
    verifier.into_secret()
}

/// Compares the `state` returned by the provider with the one we issued.
///
/// Runs in time independent of where the strings differ.
#[must_use]
pub fn states_match(issued: &str, returned: &str) -> bool {
    if issued.is_empty() || issued.len() != returned.len() {
        return false;
    }
    issued
        .bytes()
        .zip(returned.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Everything the login endpoint needs to redirect the browser.
#[derive(Clone)]
pub struct LoginInitiation {
    /// Provider URL to redirect to.
    pub authorization_url: String,
    /// `state` value to store in [`STATE_COOKIE`].
    pub state: String,
    /// Verifier to store in [`CODE_VERIFIER_COOKIE`].
    pub code_verifier: String,
}

impl fmt::Debug for LoginInitiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInitiation")
            .field("authorization_url", &self.authorization_url)
            .finish_non_exhaustive()
    }
}

/// Starts a sign-in: fresh state and verifier plus the provider URL built
/// from them.
pub fn begin_login(provider: &dyn IdentityProvider) -> LoginInitiation {
    let state = generate_state();
    let code_verifier = generate_code_verifier();
    let authorization_url = provider.authorization_url(&state, &code_verifier, GOOGLE_SCOPES);
    LoginInitiation {
        authorization_url,
        state,
        code_verifier,
    }
}

/// Tokens returned by a successful code redemption.
#[derive(Clone)]
pub struct ProviderTokens {
    pub access_token: String,
}

impl fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderTokens(<redacted>)")
    }
}

/// Profile claims for the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderProfile {
    /// Stable account identifier (`sub`).
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// An OAuth 2.0 identity provider supporting PKCE.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Builds the authorization URL for `state`, deriving the S256 challenge
    /// from `code_verifier`.
    fn authorization_url(&self, state: &str, code_verifier: &str, scopes: &[&str]) -> String;

    /// Redeems an authorization code.
    async fn validate_authorization_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderTokens, Report<SessionError>>;

    /// Fetches the profile of the account the tokens belong to.
    async fn fetch_profile(
        &self,
        tokens: &ProviderTokens,
    ) -> Result<ProviderProfile, Report<SessionError>>;
}
