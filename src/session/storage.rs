use dashmap::DashMap;
use std::sync::Arc;

/// Durable key-value persistence for the session layer.
///
/// Abstracts whatever the host environment offers (browser local storage, a
/// config directory, an OS keyring) behind the three operations the session
/// store needs, so it can be faked in tests.
pub trait Storage: Send + Sync + 'static {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);

    /// Removes the value stored under `key`, if any.
    fn remove(&self, key: &str);
}

/// In-memory [`Storage`] implementation.
///
/// Cloning shares the underlying map, so a test can hold one handle to seed
/// or inspect records while the session store holds another.
///
/// # Example
///
/// ```rust
/// use marquee::session::storage::{MemoryStorage, Storage};
///
/// let storage = MemoryStorage::new();
/// let inspector = storage.clone();
///
/// storage.set("user", r#"{"_id":"1"}"#);
/// assert_eq!(inspector.get("user").as_deref(), Some(r#"{"_id":"1"}"#));
///
/// storage.remove("user");
/// assert!(inspector.get("user").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|value| value.clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.get("user").is_none());

        storage.set("user", "alice");
        assert_eq!(storage.get("user").as_deref(), Some("alice"));

        storage.set("user", "bob");
        assert_eq!(storage.get("user").as_deref(), Some("bob"));

        storage.remove("user");
        assert!(storage.get("user").is_none());
    }

    #[test]
    fn test_clone_shares_entries() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        storage.set("user", "alice");
        assert_eq!(other.get("user").as_deref(), Some("alice"));
    }
}
