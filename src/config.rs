use url::Url;

use crate::error::Error;

/// Route the identity provider redirects back to. Must match the client's
/// registered redirect URI exactly.
pub const CALLBACK_PATH: &str = "/auth/callback";

const DEFAULT_AUTH_URL: &str = "http://localhost:8180";
const DEFAULT_CLIENT_ID: &str = "sitesecurity-frontend";
const DEFAULT_REALM: &str = "sitesecurity";
const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";

/// Keycloak client configuration, fixed for the life of the process.
///
/// ```rust,ignore
/// let config = AuthConfig::new(
///     "https://sso.example.com".parse()?,
///     "sitesecurity-frontend",
///     "sitesecurity",
///     "https://dashboard.example.com".parse()?,
/// )?;
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthConfig {
    pub(crate) issuer_base_url: Url,
    pub(crate) client_id: String,
    pub(crate) realm: String,
    pub(crate) app_origin: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl AuthConfig {
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `issuer_base_url` cannot carry a path, or
    /// [`Error::Url`] if the callback URI cannot be derived from `app_origin`.
    pub fn new(
        issuer_base_url: Url,
        client_id: impl Into<String>,
        realm: impl Into<String>,
        app_origin: Url,
    ) -> Result<Self, Error> {
        if issuer_base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "issuer URL cannot carry a path: {issuer_base_url}"
            )));
        }
        let redirect_uri = app_origin.join(CALLBACK_PATH)?;

        Ok(Self {
            issuer_base_url,
            client_id: client_id.into(),
            realm: realm.into(),
            app_origin,
            redirect_uri,
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
        })
    }

    /// Override the requested scopes (default: `openid profile email`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Where the identity provider sends the browser after logout: the bare
    /// app origin, without a trailing slash.
    #[must_use]
    pub fn post_logout_redirect_uri(&self) -> String {
        self.app_origin.origin().ascii_serialization()
    }

    #[must_use]
    pub fn authorization_endpoint(&self) -> Url {
        self.openid_connect_endpoint("auth")
    }

    #[must_use]
    pub fn token_endpoint(&self) -> Url {
        self.openid_connect_endpoint("token")
    }

    #[must_use]
    pub fn logout_endpoint(&self) -> Url {
        self.openid_connect_endpoint("logout")
    }

    fn openid_connect_endpoint(&self, leaf: &str) -> Url {
        let mut url = self.issuer_base_url.clone();
        // cannot_be_a_base was rejected in new(), so this always succeeds
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "realms",
                self.realm.as_str(),
                "protocol",
                "openid-connect",
                leaf,
            ]);
        }
        url
    }
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Settings {
    pub auth: AuthConfig,
    pub api_base_url: Url,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// # Env vars (all optional)
    /// - `AUTH_URL`: identity provider base URL (default `http://localhost:8180`)
    /// - `AUTH_CLIENT_ID`: OAuth2 client ID (default `sitesecurity-frontend`)
    /// - `AUTH_REALM`: Keycloak realm (default `sitesecurity`)
    /// - `AUTH_SCOPES`: comma-separated scopes (default `openid,profile,email`)
    /// - `API_URL`: REST API base URL (default `http://localhost:8080`)
    /// - `APP_ORIGIN`: dashboard origin used for redirects (default `http://localhost:3000`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the variable if a URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the variable if a URL is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty counts as unset.
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let url = |key: &str, default: &str| -> Result<Url, Error> {
            var(key, default)
                .parse()
                .map_err(|e| Error::Config(format!("{key}: {e}")))
        };

        let mut auth = AuthConfig::new(
            url("AUTH_URL", DEFAULT_AUTH_URL)?,
            var("AUTH_CLIENT_ID", DEFAULT_CLIENT_ID),
            var("AUTH_REALM", DEFAULT_REALM),
            url("APP_ORIGIN", DEFAULT_APP_ORIGIN)?,
        )?;
        if let Some(scopes) = lookup("AUTH_SCOPES") {
            auth = auth.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        Ok(Self {
            auth,
            api_base_url: url("API_URL", DEFAULT_API_URL)?,
        })
    }
}
