use std::future::Future;

use url::Url;

use crate::error::Error;
use crate::types::AuthUser;

/// Tab-scoped key/value storage that survives the round trip to the identity
/// provider but not the end of the browsing session.
///
/// Holds the pending PKCE transaction while the browser is away.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Full-page navigation. After `navigate` the current page is gone, so
/// callers treat it as the last thing they do.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

impl<F> Navigator for F
where
    F: Fn(&Url) + Send + Sync,
{
    fn navigate(&self, url: &Url) {
        self(url);
    }
}

/// Identity provider backend.
///
/// [`KeycloakProvider`](crate::KeycloakProvider) is the shipped implementation;
/// [`AuthContext`](crate::AuthContext) and [`ApiClient`](crate::ApiClient) only
/// depend on this trait and the shared token store.
pub trait AuthProvider: Send + Sync + 'static {
    /// Start a sign-in: persist a fresh PKCE transaction and navigate to the
    /// authorization endpoint.
    fn login(&self);

    /// Drop local session state and navigate to the provider's logout endpoint.
    fn logout(&self);

    /// Validate the redirect and exchange `code` for tokens.
    fn handle_callback(
        &self,
        code: &str,
        state: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Decoded user for the live session, if any. No I/O.
    fn get_user(&self) -> Option<AuthUser>;

    /// Current access token, if present and not expired.
    fn get_token(&self) -> Option<String>;

    fn is_authenticated(&self) -> bool;
}
