//! Durable subscription store
//!
//! The set of symbols the poller keeps fresh. Persisted as a small JSON
//! document `{"symbols": [...]}`; rewritten atomically (temp file in the
//! same directory, then rename) so readers never observe a partial write.

use crate::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct SubscriptionDoc {
    symbols: Vec<String>,
}

/// Case-insensitively unique symbol set with JSON persistence
pub struct SubscriptionStore {
    path: PathBuf,
    symbols: Mutex<BTreeSet<String>>,
}

impl SubscriptionStore {
    /// Load from `path`, falling back to `defaults` when the document is
    /// missing or unreadable
    pub fn load(path: &Path, defaults: &[String]) -> Self {
        let symbols = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<SubscriptionDoc>(&raw) {
                Ok(doc) => doc.symbols,
                Err(e) => {
                    warn!("Malformed subscription document, using defaults: {}", e);
                    defaults.to_vec()
                }
            },
            Err(_) => defaults.to_vec(),
        };

        let normalized: BTreeSet<String> =
            symbols.iter().map(|s| s.trim().to_uppercase()).collect();
        info!("Loaded {} subscriptions", normalized.len());

        Self {
            path: path.to_path_buf(),
            symbols: Mutex::new(normalized),
        }
    }

    /// Insert a symbol; returns false if it was already subscribed
    pub fn add(&self, symbol: &str) -> bool {
        self.symbols.lock().insert(symbol.trim().to_uppercase())
    }

    /// Remove a symbol; returns false if it was not subscribed
    pub fn remove(&self, symbol: &str) -> bool {
        self.symbols.lock().remove(&symbol.trim().to_uppercase())
    }

    /// Current symbol list
    pub fn list(&self) -> Vec<String> {
        self.symbols.lock().iter().cloned().collect()
    }

    /// Atomically rewrite the document with the current set
    pub fn save(&self) -> Result<()> {
        let doc = SubscriptionDoc {
            symbols: self.list(),
        };
        let payload = serde_json::to_vec_pretty(&doc)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
        let mut tmp = tempfile::NamedTempFile::new_in(if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        })?;
        tmp.write_all(&payload)?;
        tmp.persist(&self.path)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_add_normalizes_and_dedupes() {
        let dir = tempdir().unwrap();
        let store = SubscriptionStore::load(&dir.path().join("subscriptions.json"), &[]);

        assert!(store.add("infy.ns"));
        assert!(!store.add("INFY.NS"));
        assert!(!store.add(" infy.ns "));
        assert_eq!(store.list(), vec!["INFY.NS"]);
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let store = SubscriptionStore::load(&dir.path().join("subscriptions.json"), &[]);
        store.add("INFY.NS");

        assert!(store.remove("infy.ns"));
        assert!(!store.remove("INFY.NS"));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");

        let store = SubscriptionStore::load(&path, &[]);
        store.add("BTCUSDT");
        store.add("RELIANCE.NS");
        store.save().unwrap();

        let reloaded = SubscriptionStore::load(&path, &[]);
        assert_eq!(reloaded.list(), store.list());

        // idempotent: saving the reloaded set produces the same document
        reloaded.save().unwrap();
        let again = SubscriptionStore::load(&path, &[]);
        assert_eq!(again.list(), store.list());
    }

    #[test]
    fn test_missing_document_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let defaults = vec!["RELIANCE.NS".to_string(), "infy.ns".to_string()];
        let store = SubscriptionStore::load(&dir.path().join("absent.json"), &defaults);

        assert_eq!(store.list(), vec!["INFY.NS", "RELIANCE.NS"]);
    }

    #[test]
    fn test_malformed_document_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = SubscriptionStore::load(&path, &["TCS.NS".to_string()]);
        assert_eq!(store.list(), vec!["TCS.NS"]);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        let store = SubscriptionStore::load(&path, &[]);
        store.add("GOOD");
        store.save().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("subscriptions.json")]);
    }
}
