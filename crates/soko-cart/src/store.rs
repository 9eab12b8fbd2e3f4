//! # Local Store
//!
//! Best-effort local persistence for the guest cart and the auth session.
//!
//! Both entries are caches, not sources of truth once the session is
//! Authenticated; the engine logs and continues when persistence fails.

use serde::{Deserialize, Serialize};
use soko_core::{CartSnapshot, StoreError, StoreResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Local key the cart snapshot is persisted under
pub const CART_KEY: &str = "soko_cart";

/// Local key the auth session is persisted under
pub const AUTH_KEY: &str = "soko_auth";

/// A persisted authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Display identity of the user (email or name)
    pub user: String,
    /// Bearer token for the cart API
    pub token: String,
    pub is_authenticated: bool,
}

impl AuthSession {
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
            is_authenticated: true,
        }
    }
}

/// String key/value persistence, the localStorage analogue
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Load the cached cart snapshot, if any
pub fn load_cart(store: &dyn LocalStore) -> StoreResult<Option<CartSnapshot>> {
    match store.get(CART_KEY)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Serialization(format!("Corrupt cached cart: {e}"))),
        None => Ok(None),
    }
}

/// Persist the cart snapshot
pub fn save_cart(store: &dyn LocalStore, snapshot: &CartSnapshot) -> StoreResult<()> {
    let raw = serde_json::to_string(snapshot)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.set(CART_KEY, &raw)
}

/// Load the cached auth session, if any
pub fn load_session(store: &dyn LocalStore) -> StoreResult<Option<AuthSession>> {
    match store.get(AUTH_KEY)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Serialization(format!("Corrupt cached session: {e}"))),
        None => Ok(None),
    }
}

/// Persist the auth session
pub fn save_session(store: &dyn LocalStore, session: &AuthSession) -> StoreResult<()> {
    let raw = serde_json::to_string(session)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.set(AUTH_KEY, &raw)
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON file per key under a directory
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Configuration(format!("Cannot create store dir: {e}")))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Internal(format!("Store read failed: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        debug!("Persisting {} ({} bytes)", key, value.len());
        std::fs::write(self.path_for(key), value)
            .map_err(|e| StoreError::Internal(format!("Store write failed: {e}")))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Internal(format!("Store remove failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soko_core::{Cart, LineItem, Price, Product};

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_cart_cache_roundtrip() {
        let store = MemoryStore::new();
        assert!(load_cart(&store).unwrap().is_none());

        let product = Product::new(
            "tea-500g",
            "Kericho Gold 500g",
            Price::from_cents(45000, soko_core::Currency::KES),
        );
        let mut cart = Cart::new();
        cart.merge_item(LineItem::from_product(&product, 2, vec![]));
        let snapshot = CartSnapshot::from_cart(&cart);

        save_cart(&store, &snapshot).unwrap();
        assert_eq!(load_cart(&store).unwrap(), Some(snapshot));
    }

    #[test]
    fn test_session_cache_roundtrip() {
        let store = MemoryStore::new();
        let session = AuthSession::new("amina@example.com", "tok_123");

        save_session(&store, &session).unwrap();
        assert_eq!(load_session(&store).unwrap(), Some(session));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        store.set(CART_KEY, "{}").unwrap();
        assert_eq!(store.get(CART_KEY).unwrap().as_deref(), Some("{}"));

        store.remove(CART_KEY).unwrap();
        assert_eq!(store.get(CART_KEY).unwrap(), None);
        // Removing a missing key is not an error
        store.remove(CART_KEY).unwrap();
    }
}
