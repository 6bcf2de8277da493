use std::sync::Arc;

use parking_lot::RwLock;

use crate::claims;
use crate::config::AuthConfig;
use crate::error::Error;
use crate::oauth::AuthClient;
use crate::session;
use crate::token_store::{TokenSet, TokenStore};
use crate::traits::{AuthProvider, Navigator, SessionStorage};
use crate::types::AuthUser;

/// OAuth2 Authorization Code + PKCE against a Keycloak realm.
///
/// The pending-callback state is not tracked in memory: it is the presence of
/// a PKCE transaction in [`SessionStorage`], which outlives reloads of the
/// page that started the login.
pub struct KeycloakProvider {
    client: AuthClient,
    tokens: Arc<TokenStore>,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    current_user: RwLock<Option<AuthUser>>,
}

impl KeycloakProvider {
    /// Create the provider, restoring the user from any live token set
    /// already held by `tokens`.
    #[must_use]
    pub fn new(
        config: AuthConfig,
        tokens: Arc<TokenStore>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let current_user = restore_user(&tokens);
        Self {
            client: AuthClient::new(config),
            tokens,
            storage,
            navigator,
            current_user: RwLock::new(current_user),
        }
    }

    /// Use a custom HTTP client for the token exchange.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = self.client.with_http_client(client);
        self
    }

    #[must_use]
    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.tokens
    }
}

/// Decode the user behind a surviving token set. A set that cannot be
/// decoded is treated as corrupt and dropped.
///
/// Reads the `id_token`, the same source `handle_callback` decodes after the
/// exchange, so a restored user matches a freshly signed-in one.
fn restore_user(tokens: &TokenStore) -> Option<AuthUser> {
    let set = tokens.snapshot()?;
    match claims::decode_user(&set.id_token) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "Stored token set is unreadable, clearing it");
            tokens.clear();
            None
        }
    }
}

impl AuthProvider for KeycloakProvider {
    fn login(&self) {
        let request = self.client.authorization_url();
        session::store_transaction(self.storage.as_ref(), &request.transaction);
        tracing::debug!("Redirecting to identity provider for login");
        self.navigator.navigate(&request.url);
    }

    fn logout(&self) {
        *self.current_user.write() = None;
        self.tokens.clear();
        tracing::info!("Signed out, redirecting to identity provider logout");
        self.navigator.navigate(&self.client.logout_url());
    }

    async fn handle_callback(&self, code: &str, state: &str) -> Result<(), Error> {
        // The stale transaction is left in place on every rejection below.
        let stored_state = session::stored_state(self.storage.as_ref());
        let stored_verifier = session::stored_verifier(self.storage.as_ref());

        // Nothing stored at all: already consumed, or started in another tab.
        if stored_state.is_none() && stored_verifier.is_none() {
            tracing::warn!("No pending PKCE transaction at callback");
            return Err(Error::MissingVerifier);
        }
        if stored_state.as_deref() != Some(state) {
            tracing::warn!(stored = stored_state.is_some(), "OAuth state mismatch");
            return Err(Error::InvalidState);
        }
        let code_verifier = stored_verifier.ok_or_else(|| {
            tracing::warn!("PKCE code verifier missing at callback");
            Error::MissingVerifier
        })?;

        let response = self
            .client
            .exchange_code(code, &code_verifier)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Token exchange failed"))?;

        let lifetime_millis = i64::try_from(response.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let tokens = TokenSet {
            expires_at_millis: self.tokens.now_millis().saturating_add(lifetime_millis),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
        };
        let id_token = tokens.id_token.clone();
        self.tokens.write(tokens);

        let user = match claims::decode_user(&id_token) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Id token could not be decoded, staying signed out");
                self.tokens.clear();
                None
            }
        };
        if let Some(user) = &user {
            tracing::info!(subject = %user.subject_id, "Sign-in completed");
        }
        *self.current_user.write() = user;

        session::clear_transaction(self.storage.as_ref());
        Ok(())
    }

    fn get_user(&self) -> Option<AuthUser> {
        if self.tokens.read().is_none() {
            // Expired or cleared elsewhere: the user goes with the tokens.
            *self.current_user.write() = None;
            return None;
        }
        self.current_user.read().clone()
    }

    fn get_token(&self) -> Option<String> {
        self.tokens.read()
    }

    fn is_authenticated(&self) -> bool {
        self.current_user.read().is_some() && self.tokens.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;
    use crate::navigator::RecordingNavigator;
    use crate::session::{CODE_VERIFIER_KEY, MemorySessionStorage, STATE_KEY};
    use crate::token_store::{Clock, ManualClock};

    fn id_token(sub: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{sub}","email":"{sub}@x"}}"#));
        format!("h.{payload}.s")
    }

    fn config() -> AuthConfig {
        AuthConfig::new(
            "http://127.0.0.1:9".parse().unwrap(),
            "dashboard",
            "sitesecurity",
            "http://localhost:3000".parse().unwrap(),
        )
        .unwrap()
    }

    struct Harness {
        clock: Arc<ManualClock>,
        tokens: Arc<TokenStore>,
        storage: Arc<MemorySessionStorage>,
        navigator: Arc<RecordingNavigator>,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(1_000_000));
            Self {
                tokens: Arc::new(TokenStore::with_clock(clock.clone())),
                clock,
                storage: Arc::new(MemorySessionStorage::new()),
                navigator: Arc::new(RecordingNavigator::new()),
            }
        }

        fn provider(&self) -> KeycloakProvider {
            KeycloakProvider::new(
                config(),
                self.tokens.clone(),
                self.storage.clone(),
                self.navigator.clone(),
            )
        }

        fn seed_tokens(&self, id_token: String, ttl_millis: i64) {
            self.tokens.write(TokenSet {
                access_token: "access".into(),
                refresh_token: None,
                id_token,
                expires_at_millis: self.clock.now_millis() + ttl_millis,
            });
        }
    }

    #[test]
    fn login_persists_transaction_and_navigates() {
        let h = Harness::new();
        h.provider().login();

        let verifier = h.storage.get(CODE_VERIFIER_KEY).unwrap();
        let state = h.storage.get(STATE_KEY).unwrap();
        let url = h.navigator.last().unwrap();
        let q: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();

        assert_eq!(q["state"], state);
        assert_eq!(q["code_challenge"], crate::pkce::generate_code_challenge(&verifier));
    }

    #[test]
    fn construction_restores_user_from_live_tokens() {
        let h = Harness::new();
        h.seed_tokens(id_token("restored"), 60_000);

        let provider = h.provider();
        assert!(provider.is_authenticated());
        assert_eq!(provider.get_user().unwrap().subject_id.as_str(), "restored");
    }

    #[test]
    fn construction_clears_undecodable_tokens() {
        let h = Harness::new();
        h.seed_tokens("garbage".into(), 60_000);

        let provider = h.provider();
        assert!(provider.get_user().is_none());
        assert!(!provider.is_authenticated());
        assert_eq!(h.tokens.read(), None);
    }

    #[test]
    fn expired_session_reports_signed_out() {
        let h = Harness::new();
        h.seed_tokens(id_token("u"), 1_000);
        let provider = h.provider();
        assert!(provider.is_authenticated());

        h.clock.advance_secs(2);
        assert!(!provider.is_authenticated());
        assert!(provider.get_user().is_none());
        assert!(provider.get_token().is_none());
    }

    #[test]
    fn logout_clears_state_and_navigates() {
        let h = Harness::new();
        h.seed_tokens(id_token("u"), 60_000);
        let provider = h.provider();

        provider.logout();
        assert_eq!(h.tokens.read(), None);
        assert!(provider.get_user().is_none());
        assert!(
            h.navigator
                .last()
                .unwrap()
                .path()
                .ends_with("/protocol/openid-connect/logout")
        );
    }

    #[tokio::test]
    async fn callback_rejects_mismatched_state_without_touching_storage() {
        let h = Harness::new();
        h.storage.set(STATE_KEY, "abc");
        h.storage.set(CODE_VERIFIER_KEY, "verifier");
        let provider = h.provider();

        for bad in ["xyz", "", "abc ", "ABC"] {
            let err = provider.handle_callback("code", bad).await.unwrap_err();
            assert!(matches!(err, Error::InvalidState), "state {bad:?}");
        }
        assert_eq!(h.storage.get(STATE_KEY).as_deref(), Some("abc"));
        assert_eq!(h.storage.get(CODE_VERIFIER_KEY).as_deref(), Some("verifier"));
    }

    #[tokio::test]
    async fn callback_without_transaction_is_missing_verifier() {
        let provider = Harness::new().provider();
        let err = provider.handle_callback("code", "anything").await.unwrap_err();
        assert!(matches!(err, Error::MissingVerifier));
    }

    #[tokio::test]
    async fn callback_with_verifier_but_no_state_is_invalid_state() {
        let h = Harness::new();
        h.storage.set(CODE_VERIFIER_KEY, "verifier");
        let err = h.provider().handle_callback("code", "abc").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState));
    }

    #[tokio::test]
    async fn callback_with_state_but_no_verifier() {
        let h = Harness::new();
        h.storage.set(STATE_KEY, "abc");
        let err = h.provider().handle_callback("code", "abc").await.unwrap_err();
        assert!(matches!(err, Error::MissingVerifier));
    }
}
