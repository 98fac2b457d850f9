//! Google sign-in over OAuth 2.0 with PKCE.
//!
//! Endpoint URLs are validated once at construction; each request builds a
//! short-lived `BasicClient` from them.

use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use pushbox_session::{
    GoogleConfig, IdentityProvider, ProviderProfile, ProviderTokens, SessionError,
};
use rootcause::prelude::Report;
use tracing::debug;

const PROVIDER: &str = "google";

/// Google implementation of [`IdentityProvider`].
#[derive(Clone)]
pub struct GoogleClient {
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    userinfo_url: String,
    http: reqwest::Client,
}

impl GoogleClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a provider error if any configured URL is malformed or the
    /// HTTP client cannot be built.
    pub fn new(config: &GoogleConfig) -> Result<Self, Report<SessionError>> {
        let invalid = |what: &str, e: oauth2::url::ParseError| {
            SessionError::provider(PROVIDER, format!("invalid {what} URL: {e}"))
        };
        let auth_url =
            AuthUrl::new(config.auth_url().to_string()).map_err(|e| invalid("auth", e))?;
        let token_url =
            TokenUrl::new(config.token_url().to_string()).map_err(|e| invalid("token", e))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri().to_string())
            .map_err(|e| invalid("redirect", e))?;

        // Redirects are disabled so the token endpoint cannot bounce us elsewhere.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SessionError::provider(PROVIDER, format!("HTTP client error: {e}")))?;

        Ok(Self {
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            auth_url,
            token_url,
            redirect_url,
            userinfo_url: config.userinfo_url().to_string(),
            http,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn authorization_url(&self, state: &str, code_verifier: &str, scopes: &[&str]) -> String {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            code_verifier.to_string(),
        ));

        let mut request = client
            .authorize_url(|| CsrfToken::new(state.to_string()))
            .set_pkce_challenge(challenge);
        for scope in scopes {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }
        // Always show the account chooser.
        request = request.add_extra_param("prompt", "select_account");

        let (url, _) = request.url();
        url.to_string()
    }

    async fn validate_authorization_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderTokens, Report<SessionError>> {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(code_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| SessionError::provider(PROVIDER, format!("token exchange failed: {e}")))?;

        debug!("authorization code redeemed");
        Ok(ProviderTokens {
            access_token: token.access_token().secret().clone(),
        })
    }

    async fn fetch_profile(
        &self,
        tokens: &ProviderTokens,
    ) -> Result<ProviderProfile, Report<SessionError>> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SessionError::provider(PROVIDER, format!("userinfo request failed: {e}")))?;

        let profile = response
            .json::<ProviderProfile>()
            .await
            .map_err(|e| SessionError::provider(PROVIDER, format!("invalid userinfo body: {e}")))?;
        Ok(profile)
    }
}
