use serde::Deserialize;
use url::Url;

use crate::config::AuthConfig;
use crate::error::Error;
use crate::pkce::{self, PkceTransaction};

/// HTTP side of the Keycloak authorization code flow.
pub struct AuthClient {
    config: AuthConfig,
    http: reqwest::Client,
}

/// Authorization URL plus the PKCE material to keep until the callback.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: Url,
    pub transaction: PkceTransaction,
}

/// Body of a successful token endpoint response.
#[derive(Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub id_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (timeouts, proxies, connection reuse).
    ///
    /// No timeout is set by default: a hung token endpoint hangs the callback.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build the authorization URL around a fresh PKCE transaction.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let transaction = PkceTransaction::generate();
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.authorization_endpoint();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", &scope)
            .append_pair("state", &transaction.state)
            .append_pair("code_challenge", &transaction.code_challenge)
            .append_pair("code_challenge_method", pkce::CHALLENGE_METHOD);

        AuthorizationRequest { url, transaction }
    }

    #[must_use]
    pub fn logout_url(&self) -> Url {
        let mut url = self.config.logout_endpoint();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair(
                "post_logout_redirect_uri",
                &self.config.post_logout_redirect_uri(),
            );
        url
    }

    /// Exchange an authorization code for tokens, proving possession of the
    /// PKCE verifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network or body decoding failure, or
    /// [`Error::TokenExchangeFailed`] with the raw body on a non-2xx response.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::TokenExchangeFailed { status, body })
    }
}
