use std::collections::HashMap;

use parking_lot::Mutex;

use crate::pkce::PkceTransaction;
use crate::traits::SessionStorage;

/// Storage key for the pending PKCE code verifier.
pub const CODE_VERIFIER_KEY: &str = "pkce_code_verifier";
/// Storage key for the pending anti-CSRF state.
pub const STATE_KEY: &str = "oauth_state";

/// In-process [`SessionStorage`], one per tab.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// Persist the verifier and state of a transaction about to leave the page.
pub(crate) fn store_transaction(storage: &dyn SessionStorage, tx: &PkceTransaction) {
    storage.set(CODE_VERIFIER_KEY, &tx.code_verifier);
    storage.set(STATE_KEY, &tx.state);
}

pub(crate) fn stored_state(storage: &dyn SessionStorage) -> Option<String> {
    storage.get(STATE_KEY)
}

pub(crate) fn stored_verifier(storage: &dyn SessionStorage) -> Option<String> {
    storage.get(CODE_VERIFIER_KEY).filter(|v| !v.is_empty())
}

/// One-time use: called once the code has been exchanged.
pub(crate) fn clear_transaction(storage: &dyn SessionStorage) {
    storage.remove(CODE_VERIFIER_KEY);
    storage.remove(STATE_KEY);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_get_set_remove() {
        let storage = MemorySessionStorage::new();
        assert_eq!(storage.get("k"), None);
        storage.set("k", "v");
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        storage.remove("k");
        assert_eq!(storage.get("k"), None);
    }

    #[test]
    fn transaction_roundtrip_and_clear() {
        let storage = MemorySessionStorage::new();
        let tx = PkceTransaction::generate();
        store_transaction(&storage, &tx);

        assert_eq!(stored_state(&storage), Some(tx.state.clone()));
        assert_eq!(stored_verifier(&storage), Some(tx.code_verifier.clone()));

        clear_transaction(&storage);
        assert_eq!(stored_state(&storage), None);
        assert_eq!(stored_verifier(&storage), None);
    }

    #[test]
    fn empty_verifier_counts_as_missing() {
        let storage = MemorySessionStorage::new();
        storage.set(CODE_VERIFIER_KEY, "");
        assert_eq!(stored_verifier(&storage), None);
    }
}
