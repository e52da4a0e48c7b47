//! Local key-value persistence: best score and remembered credentials.
//!
//! One small JSON file, read once at startup and rewritten only when a
//! value actually changes. A corrupted or unreadable file resets to
//! defaults; a failed write logs and degrades to in-memory state.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    best_score: i32,
    /// base64 of "username\npassword"; present only if the user opted
    /// into remembering credentials.
    credentials: Option<String>,
}

pub struct Store {
    path: Option<PathBuf>,
    data: StoreData,
}

impl Store {
    /// Opens the store file, discarding corrupted contents.
    pub fn open(path: PathBuf) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Discarding corrupted store {}: {}", path.display(), e);
                StoreData::default()
            }),
            Err(_) => StoreData::default(),
        };
        Self {
            path: Some(path),
            data,
        }
    }

    /// A store that never touches disk; the fallback when persistence
    /// is unavailable.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: StoreData::default(),
        }
    }

    pub fn best_score(&self) -> i32 {
        self.data.best_score
    }

    pub fn set_best_score(&mut self, score: i32) {
        if score == self.data.best_score {
            return;
        }
        self.data.best_score = score;
        self.persist();
    }

    /// Decodes remembered credentials, discarding anything malformed.
    pub fn credentials(&self) -> Option<(String, String)> {
        let encoded = self.data.credentials.as_ref()?;
        let bytes = BASE64.decode(encoded).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        let (user, pass) = text.split_once('\n')?;
        if user.is_empty() {
            return None;
        }
        Some((user.to_string(), pass.to_string()))
    }

    pub fn set_credentials(&mut self, username: &str, password: &str) {
        let encoded = BASE64.encode(format!("{}\n{}", username, password));
        self.data.credentials = Some(encoded);
        self.persist();
    }

    pub fn clear_credentials(&mut self) {
        if self.data.credentials.take().is_some() {
            self.persist();
        }
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let text = match serde_json::to_string(&self.data) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize store: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(path, text) {
            warn!(
                "Failed to write store {}; continuing in memory: {}",
                path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_store_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "snake_arcade_store_test_{}_{}.json",
            std::process::id(),
            n
        ))
    }

    #[test]
    fn best_score_round_trip() {
        let path = temp_store_path();
        {
            let mut store = Store::open(path.clone());
            store.set_best_score(170);
        }
        let store = Store::open(path.clone());
        assert_eq!(store.best_score(), 170);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupted_file_resets_to_defaults() {
        let path = temp_store_path();
        fs::write(&path, "{not json at all").unwrap();
        let store = Store::open(path.clone());
        assert_eq!(store.best_score(), 0);
        assert!(store.credentials().is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn credentials_round_trip_and_clear() {
        let path = temp_store_path();
        let mut store = Store::open(path.clone());
        store.set_credentials("bee", "hunter:2\u{1F41D}");
        assert_eq!(
            store.credentials(),
            Some(("bee".to_string(), "hunter:2\u{1F41D}".to_string()))
        );

        let reloaded = Store::open(path.clone());
        assert_eq!(reloaded.credentials(), store.credentials());

        store.clear_credentials();
        assert!(store.credentials().is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupted_credentials_are_discarded() {
        let mut store = Store::in_memory();
        store.data.credentials = Some("***not base64***".into());
        assert!(store.credentials().is_none());
    }

    #[test]
    fn in_memory_store_never_persists() {
        let mut store = Store::in_memory();
        store.set_best_score(40);
        assert_eq!(store.best_score(), 40);
    }
}
