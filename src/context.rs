//! Publishes auth state to the rest of the application.
//!
//! [`AuthContext`] wraps any [`AuthProvider`] and re-broadcasts its user
//! through a [`tokio::sync::watch`] channel, so views subscribe to state
//! changes without knowing which provider sits underneath.
//!
//! ```rust,ignore
//! let ctx = AuthContext::new(provider);
//! ctx.mount();
//! ctx.clone().provide(async {
//!     let auth = use_auth()?;
//!     if !auth.is_authenticated() {
//!         auth.login();
//!     }
//!     Ok::<_, Error>(())
//! }).await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Error;
use crate::traits::AuthProvider;
use crate::types::AuthUser;

/// What subscribers see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub user: Option<AuthUser>,
    pub is_authenticated: bool,
    /// `true` until [`AuthContext::mount`] has taken the first snapshot.
    pub is_loading: bool,
}

impl AuthSnapshot {
    fn loading() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
        }
    }
}

tokio::task_local! {
    static CURRENT_AUTH: AuthContext;
}

/// Shared handle to the mounted auth state. Cloning is cheap.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Box<dyn AuthProviderDyn>,
    state: watch::Sender<AuthSnapshot>,
}

impl AuthContext {
    #[must_use]
    pub fn new<P: AuthProvider>(provider: P) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::loading());
        Self {
            inner: Arc::new(Inner {
                provider: Box::new(provider),
                state,
            }),
        }
    }

    /// Take the first snapshot of the provider's user, ending the loading phase.
    pub fn mount(&self) {
        self.publish();
    }

    /// Run `fut` with this context reachable through [`use_auth`].
    pub async fn provide<F: Future>(self, fut: F) -> F::Output {
        CURRENT_AUTH.scope(self, fut).await
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.state.subscribe()
    }

    /// Current state, re-read from the provider. A token set that expired
    /// since the last publish shows up here as signed out, and subscribers
    /// are notified of the change.
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.refresh();
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.snapshot().user
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn login(&self) {
        self.inner.provider.login_dyn();
    }

    pub fn logout(&self) {
        self.inner.provider.logout_dyn();
        self.publish();
    }

    #[must_use]
    pub fn get_token(&self) -> Option<String> {
        self.inner.provider.get_token_dyn()
    }

    /// Complete the code exchange, then republish so subscribers see the
    /// signed-in user in one update.
    ///
    /// # Errors
    ///
    /// Propagates the provider's callback error unchanged.
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<(), Error> {
        self.inner.provider.handle_callback_dyn(code, state).await?;
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        let snapshot = self.read_provider();
        self.inner.state.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    /// Republish after mount only; before it the context stays loading.
    fn refresh(&self) {
        if self.is_loading() {
            return;
        }
        self.publish();
    }

    fn read_provider(&self) -> AuthSnapshot {
        let provider = &self.inner.provider;
        let user = provider.get_user_dyn();
        AuthSnapshot {
            is_authenticated: user.is_some() && provider.is_authenticated_dyn(),
            user,
            is_loading: false,
        }
    }
}

/// The [`AuthContext`] installed by the enclosing [`AuthContext::provide`].
///
/// # Errors
///
/// Returns [`Error::Config`] when called outside any `provide` scope. That is
/// a wiring bug in the caller, not a runtime condition.
pub fn use_auth() -> Result<AuthContext, Error> {
    CURRENT_AUTH
        .try_with(Clone::clone)
        .map_err(|_| Error::Config("use_auth must be used within AuthContext::provide".into()))
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe wrapper for AuthProvider (needed for Box<dyn>).
trait AuthProviderDyn: Send + Sync {
    fn login_dyn(&self);
    fn logout_dyn(&self);
    fn handle_callback_dyn<'a>(&'a self, code: &'a str, state: &'a str)
    -> BoxFuture<'a, Result<(), Error>>;
    fn get_user_dyn(&self) -> Option<AuthUser>;
    fn get_token_dyn(&self) -> Option<String>;
    fn is_authenticated_dyn(&self) -> bool;
}

impl<T: AuthProvider> AuthProviderDyn for T {
    fn login_dyn(&self) {
        self.login();
    }

    fn logout_dyn(&self) {
        self.logout();
    }

    fn handle_callback_dyn<'a>(
        &'a self,
        code: &'a str,
        state: &'a str,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(self.handle_callback(code, state))
    }

    fn get_user_dyn(&self) -> Option<AuthUser> {
        self.get_user()
    }

    fn get_token_dyn(&self) -> Option<String> {
        self.get_token()
    }

    fn is_authenticated_dyn(&self) -> bool {
        self.is_authenticated()
    }
}
