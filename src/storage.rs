//! Durable key-value storage and the best-effort session persistence on top of it

use crate::content::ChapterNumber;
use crate::error::NoorError;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

pub const STORAGE_KEY_CHAPTER: &str = "quran_surah_id";
pub const STORAGE_KEY_PAGE: &str = "quran_page";

/// Simple string key-value store. Any call may fail with
/// `NoorError::StorageUnavailable`; callers decide whether to care.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, NoorError>;
    fn set(&self, key: &str, value: &str) -> Result<(), NoorError>;
    fn remove(&self, key: &str) -> Result<(), NoorError>;
}

/// SQLite-backed store using a single `app_settings(key, value)` table.
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the settings database at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, NoorError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NoorError::StorageUnavailable(e.to_string()))?;
        }
        Self::init_db(&db_path)?;
        Ok(Self { db_path })
    }

    // Each call creates a new connection
    fn connection(&self) -> Result<Connection, NoorError> {
        Ok(Connection::open(&self.db_path)?)
    }

    fn init_db(path: &Path) -> Result<(), NoorError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, NoorError> {
        let conn = self.connection()?;
        let value = conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), NoorError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), NoorError> {
        let conn = self.connection()?;
        conn.execute("DELETE FROM app_settings WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// Process-local store, used when no durable location is available.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, NoorError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), NoorError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), NoorError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// Persisted "resume where you left off" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub selected_chapter: Option<ChapterNumber>,
    pub current_page: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            selected_chapter: None,
            current_page: 1,
        }
    }
}

/// Session persistence boundary: never fails, never blocks the caller on a
/// broken store. Failures are logged and dropped.
pub struct SessionPersistence {
    store: Arc<dyn KeyValueStore>,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "session storage read failed");
                None
            }
        }
    }

    /// Stored state with invalid entries already discarded.
    pub fn load(&self) -> SessionState {
        let selected_chapter = self
            .read(STORAGE_KEY_CHAPTER)
            .and_then(|raw| {
                let parsed = ChapterNumber::parse(&raw);
                if parsed.is_none() {
                    tracing::debug!(raw = %raw, "discarding invalid persisted chapter");
                }
                parsed
            });
        let current_page = self
            .read(STORAGE_KEY_PAGE)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        SessionState {
            selected_chapter,
            current_page,
        }
    }

    pub fn save(&self, chapter: ChapterNumber, page: usize) {
        let writes = [
            (STORAGE_KEY_CHAPTER, chapter.to_string()),
            (STORAGE_KEY_PAGE, page.max(1).to_string()),
        ];
        for (key, value) in writes {
            if let Err(e) = self.store.set(key, &value) {
                tracing::warn!(key, error = %e, "session storage write failed");
            }
        }
    }

    pub fn clear(&self) {
        for key in [STORAGE_KEY_CHAPTER, STORAGE_KEY_PAGE] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "session storage remove failed");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Store whose every call fails, like a browser with storage disabled.
    pub(crate) struct UnavailableStore;

    impl KeyValueStore for UnavailableStore {
        fn get(&self, _key: &str) -> Result<Option<String>, NoorError> {
            Err(NoorError::StorageUnavailable("disabled".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), NoorError> {
            Err(NoorError::StorageUnavailable("disabled".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), NoorError> {
            Err(NoorError::StorageUnavailable("disabled".into()))
        }
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("nested").join("settings.db")).unwrap();

        assert_eq!(store.get("missing").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        SqliteStore::open(&path).unwrap().set(STORAGE_KEY_PAGE, "4").unwrap();
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get(STORAGE_KEY_PAGE).unwrap().as_deref(), Some("4"));
    }

    #[test]
    fn test_persistence_discards_invalid_values() {
        let store = Arc::new(MemoryStore::new());
        store.set(STORAGE_KEY_CHAPTER, "200").unwrap();
        store.set(STORAGE_KEY_PAGE, "zero").unwrap();
        let state = SessionPersistence::new(store.clone()).load();
        assert_eq!(state, SessionState::default());

        store.set(STORAGE_KEY_CHAPTER, "18").unwrap();
        store.set(STORAGE_KEY_PAGE, "0").unwrap();
        let state = SessionPersistence::new(store).load();
        assert_eq!(state.selected_chapter, ChapterNumber::new(18).ok());
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn test_persistence_save_and_clear() {
        let store = Arc::new(MemoryStore::new());
        let persistence = SessionPersistence::new(store.clone());
        persistence.save(ChapterNumber::new(2).unwrap(), 3);
        assert_eq!(store.get(STORAGE_KEY_CHAPTER).unwrap().as_deref(), Some("2"));
        assert_eq!(persistence.load().current_page, 3);

        persistence.clear();
        assert_eq!(persistence.load(), SessionState::default());
    }

    #[test]
    fn test_persistence_swallows_storage_failures() {
        let persistence = SessionPersistence::new(Arc::new(UnavailableStore));
        persistence.save(ChapterNumber::new(1).unwrap(), 1);
        persistence.clear();
        assert_eq!(persistence.load(), SessionState::default());
    }
}
