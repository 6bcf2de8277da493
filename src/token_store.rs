use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use time::OffsetDateTime;

/// Millisecond time source for expiry checks.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000)
            .unwrap_or(i64::MAX)
    }
}

/// Settable clock for simulated time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Tokens from one code exchange. Always replaced as a whole.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    /// Stored but never used; expiry forces a fresh login.
    pub refresh_token: Option<String>,
    pub id_token: String,
    pub expires_at_millis: i64,
}

impl TokenSet {
    /// `true` once `now_millis` reaches the expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at_millis
    }
}

// Token values stay out of logs.
impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("id_token", &"<redacted>")
            .field("expires_at_millis", &self.expires_at_millis)
            .finish()
    }
}

/// Holder of the live [`TokenSet`], shared by the auth provider and the API
/// client through an `Arc`.
///
/// Every read enforces expiry: an expired set is evicted the moment it is
/// observed, so no token is ever handed out past its expiry.
pub struct TokenStore {
    clock: Arc<dyn Clock>,
    current: Mutex<Option<TokenSet>>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            current: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Current access token, or `None` if absent or expired.
    #[must_use]
    pub fn read(&self) -> Option<String> {
        self.snapshot().map(|t| t.access_token)
    }

    /// Full live token set, with the same expiry rule as [`read`](Self::read).
    #[must_use]
    pub fn snapshot(&self) -> Option<TokenSet> {
        let now = self.clock.now_millis();
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|t| t.is_expired_at(now)) {
            tracing::debug!("Evicting expired token set");
            *current = None;
        }
        current.clone()
    }

    pub fn write(&self, tokens: TokenSet) {
        *self.current.lock() = Some(tokens);
    }

    pub fn clear(&self) {
        *self.current.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(expires_at_millis: i64) -> TokenSet {
        TokenSet {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            id_token: "id".into(),
            expires_at_millis,
        }
    }

    #[test]
    fn empty_store_reads_none() {
        assert_eq!(TokenStore::new().read(), None);
    }

    #[test]
    fn read_returns_live_token() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = TokenStore::with_clock(clock);
        store.write(tokens(2_000));
        assert_eq!(store.read().as_deref(), Some("access"));
    }

    #[test]
    fn read_evicts_once_expiry_reached() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = TokenStore::with_clock(clock.clone());
        store.write(tokens(2_000));

        clock.set(1_999);
        assert!(store.read().is_some());

        clock.set(2_000);
        assert_eq!(store.read(), None);

        // evicted, not just hidden
        clock.set(0);
        assert_eq!(store.read(), None);
    }

    #[test]
    fn write_replaces_whole_set() {
        let store = TokenStore::with_clock(Arc::new(ManualClock::new(0)));
        store.write(tokens(10));
        store.write(TokenSet {
            access_token: "second".into(),
            refresh_token: None,
            id_token: "id2".into(),
            expires_at_millis: 20,
        });

        let current = store.snapshot().unwrap();
        assert_eq!(current.access_token, "second");
        assert_eq!(current.refresh_token, None);
        assert_eq!(current.id_token, "id2");
    }

    #[test]
    fn clear_removes_tokens() {
        let store = TokenStore::with_clock(Arc::new(ManualClock::new(0)));
        store.write(tokens(i64::MAX));
        store.clear();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn debug_redacts_tokens() {
        let rendered = format!("{:?}", tokens(5));
        assert!(!rendered.contains("\"access\""));
        assert!(!rendered.contains("\"refresh\""));
        assert!(rendered.contains("<redacted>"));
    }
}
