#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Callback `state` did not match the stored transaction.
    #[error("Invalid state parameter")]
    InvalidState,
    /// No PKCE verifier stored for this tab (already consumed or never created).
    #[error("Missing code verifier")]
    MissingVerifier,
    #[error("Token exchange failed ({status}): {body}")]
    TokenExchangeFailed { status: u16, body: String },
    #[error("Malformed id token: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("API error: {status}")]
    RequestFailed { status: u16 },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this failure aborts the sign-in flow and needs a fresh `login()`.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::InvalidState | Self::MissingVerifier | Self::TokenExchangeFailed { .. }
        )
    }
}
