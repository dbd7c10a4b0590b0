mod config;
pub mod database;

pub use config::{AccessibilityConfig, Config, EvasionConfig, ExperienceConfig};
pub use database::Database;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/portal14[-dev]/` based on PORTAL14_ENV.
///
/// Set PORTAL14_ENV=dev to use the development data directory, or
/// PORTAL14_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("PORTAL14_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PORTAL14_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("portal14-dev")
            } else {
                base_dir.join("portal14")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// String key-value store backing the accepted flag.
///
/// Plays the role browser local storage plays for the page: a handful of
/// string keys, any access of which may fail.
pub trait FlagStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: FlagStore + ?Sized> FlagStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Volatile store for simulations and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `key = value`.
    pub fn with(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.values.borrow_mut().insert(key.to_string(), value.to_string());
        store
    }
}

impl FlagStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

/// Store that refuses every access, like disabled browser storage.
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl FlagStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("storage disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage disabled".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage disabled".into()))
    }
}

/// The single persisted "accepted" flag.
///
/// Every failure is swallowed: reads fall back to "not accepted" and writes
/// are dropped. The experience works without persistence, it just starts
/// from the loading phase again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedFlag {
    key: String,
}

impl AcceptedFlag {
    pub const VALUE: &'static str = "true";

    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// True only when the stored value is exactly `"true"`.
    pub fn read(&self, store: &dyn FlagStore) -> bool {
        match store.get(&self.key) {
            Ok(value) => value.as_deref() == Some(Self::VALUE),
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "accepted flag unreadable, assuming not accepted");
                false
            }
        }
    }

    /// Persist the flag. Returns whether the write went through.
    pub fn write(&self, store: &dyn FlagStore) -> bool {
        match store.set(&self.key, Self::VALUE) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "accepted flag not persisted");
                false
            }
        }
    }

    /// Forget the flag. Returns whether the removal went through.
    pub fn clear(&self, store: &dyn FlagStore) -> bool {
        match store.remove(&self.key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "accepted flag not cleared");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_flag_reads_false() {
        let flag = AcceptedFlag::new("portal14Accepted");
        assert!(!flag.read(&MemoryStore::new()));
    }

    #[test]
    fn only_exact_true_counts() {
        let flag = AcceptedFlag::new("k");
        assert!(!flag.read(&MemoryStore::with("k", "TRUE")));
        assert!(!flag.read(&MemoryStore::with("k", "1")));
        assert!(flag.read(&MemoryStore::with("k", "true")));
    }

    #[test]
    fn write_then_read() {
        let flag = AcceptedFlag::new("k");
        let store = MemoryStore::new();
        assert!(flag.write(&store));
        assert!(flag.write(&store));
        assert!(flag.read(&store));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("true"));
        assert!(flag.clear(&store));
        assert!(!flag.read(&store));
    }

    #[test]
    fn unavailable_store_is_swallowed() {
        let flag = AcceptedFlag::new("k");
        assert!(!flag.read(&UnavailableStore));
        assert!(!flag.write(&UnavailableStore));
        assert!(!flag.clear(&UnavailableStore));
    }
}
