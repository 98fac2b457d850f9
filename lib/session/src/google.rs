//! Google OAuth client configuration.
//!
//! Google is the only identity provider. Its endpoints are fixed; the
//! deployment supplies the client credentials and the callback URL.

use serde::{Deserialize, Serialize};

/// Google authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google OpenID Connect userinfo endpoint.
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Configuration for the Google OAuth client.
///
/// Endpoint fields default to Google's production URLs and can be
/// overridden from configuration (`GOOGLE__TOKEN_URL`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// The OAuth2 client ID registered with Google.
    client_id: String,
    /// The OAuth2 client secret.
    client_secret: String,
    /// The callback URL (e.g., "https://pushbox.example/login/google/callback").
    redirect_uri: String,
    #[serde(default = "default_auth_url")]
    auth_url: String,
    #[serde(default = "default_token_url")]
    token_url: String,
    #[serde(default = "default_userinfo_url")]
    userinfo_url: String,
}

fn default_auth_url() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_userinfo_url() -> String {
    GOOGLE_USERINFO_URL.to_string()
}

impl GoogleConfig {
    /// Creates a configuration pointing at Google's production endpoints.
    #[must_use]
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
        }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    #[must_use]
    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_uses_google_endpoints() {
        let config = GoogleConfig::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://pushbox.example/login/google/callback".to_string(),
        );

        assert_eq!(config.client_id(), "client-id");
        assert_eq!(config.client_secret(), "client-secret");
        assert_eq!(
            config.redirect_uri(),
            "https://pushbox.example/login/google/callback"
        );
        assert_eq!(config.auth_url(), GOOGLE_AUTH_URL);
        assert_eq!(config.token_url(), GOOGLE_TOKEN_URL);
        assert_eq!(config.userinfo_url(), GOOGLE_USERINFO_URL);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "client_id": "my-client",
            "client_secret": "secret",
            "redirect_uri": "https://pushbox.example/callback"
        }"#;

        let config: GoogleConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.client_id(), "my-client");
        assert_eq!(config.token_url(), GOOGLE_TOKEN_URL);
    }

    #[test]
    fn endpoints_can_be_overridden() {
        let json = r#"{
            "client_id": "a",
            "client_secret": "b",
            "redirect_uri": "https://c",
            "token_url": "http://127.0.0.1/token",
            "userinfo_url": "http://127.0.0.1/me"
        }"#;
        let config: GoogleConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.token_url(), "http://127.0.0.1/token");
        assert_eq!(config.userinfo_url(), "http://127.0.0.1/me");
        assert_eq!(config.auth_url(), GOOGLE_AUTH_URL);
    }
}
