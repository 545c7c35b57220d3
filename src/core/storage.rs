//! Key/value persistence for the conversation, persona and theme.
//!
//! Each value lives under its own versioned key and is read once at start-up
//! and rewritten whenever it changes. Reads never fail: a missing or
//! unreadable value yields the same default the application starts with.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::message::Message;
use crate::core::persona::PersonaConfig;
use crate::ui::theme::ThemeKind;

pub const HISTORY_KEY: &str = "VULCAN_DATA_HISTORY_V2";
pub const PERSONA_KEY: &str = "VULCAN_DATA_PERSONA_V2";
pub const THEME_KEY: &str = "VULCAN_DATA_THEME_V2";

#[derive(Debug)]
pub enum StorageError {
    Io {
        key: String,
        source: std::io::Error,
    },
    Encode {
        key: String,
        source: serde_json::Error,
    },
    /// The store's lock was poisoned by a panicking writer.
    Poisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { key, source } => write!(f, "Storage I/O for {key} failed: {source}"),
            StorageError::Encode { key, source } => {
                write!(f, "Could not encode {key}: {source}")
            }
            StorageError::Poisoned => write!(f, "Storage lock poisoned"),
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::Encode { source, .. } => Some(source),
            StorageError::Poisoned => None,
        }
    }
}

/// Synchronous string key/value slots.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One file per key inside a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|err| Self::io_error(key, err))?;
        let mut temp_file =
            NamedTempFile::new_in(&self.dir).map_err(|err| Self::io_error(key, err))?;
        temp_file
            .write_all(value.as_bytes())
            .map_err(|err| Self::io_error(key, err))?;
        temp_file
            .as_file_mut()
            .sync_all()
            .map_err(|err| Self::io_error(key, err))?;
        temp_file
            .persist(self.path_for(key))
            .map_err(|err| Self::io_error(key, err.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }
}

/// In-process slots, used for `--ephemeral` sessions and tests.
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
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// Typed access to the three persisted values.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(dir)))
    }

    pub fn load_history(&self) -> Vec<Message> {
        self.load_json(HISTORY_KEY).unwrap_or_default()
    }

    pub fn save_history(&self, messages: &[Message]) -> Result<(), StorageError> {
        self.save_json(HISTORY_KEY, &messages)
    }

    pub fn clear_history(&self) -> Result<(), StorageError> {
        self.store.remove(HISTORY_KEY)
    }

    pub fn load_persona(&self) -> PersonaConfig {
        self.load_json::<PersonaConfig>(PERSONA_KEY)
            .map(PersonaConfig::normalized)
            .unwrap_or_default()
    }

    pub fn save_persona(&self, persona: &PersonaConfig) -> Result<(), StorageError> {
        self.save_json(PERSONA_KEY, persona)
    }

    pub fn load_theme(&self) -> ThemeKind {
        match self.read_raw(THEME_KEY) {
            Some(raw) => ThemeKind::parse(raw.trim()).unwrap_or_else(|| {
                warn!(value = %raw.trim(), "unknown stored theme; using default");
                ThemeKind::default()
            }),
            None => ThemeKind::default(),
        }
    }

    pub fn save_theme(&self, theme: ThemeKind) -> Result<(), StorageError> {
        self.store.set(THEME_KEY, theme.as_str())
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "stored value unreadable; using default");
                None
            }
        }
    }

    fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "stored value corrupt; using default");
                None
            }
        }
    }

    fn save_json<T: serde::Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use tempfile::TempDir;

    #[test]
    fn empty_store_yields_initial_state() {
        let storage = Storage::in_memory();
        assert!(storage.load_history().is_empty());
        assert_eq!(storage.load_persona(), PersonaConfig::default());
        assert_eq!(storage.load_theme(), ThemeKind::Neon);
    }

    #[test]
    fn values_round_trip_through_files() {
        let dir = TempDir::new().expect("temp dir");
        let storage = Storage::on_disk(dir.path().join("data"));

        let history = vec![Message::user("roast me"), Message::model("No.")];
        let persona = PersonaConfig {
            sarcasm: 12,
            edge: 34,
            language: "Bengali".to_string(),
            fast_reply: true,
        };
        storage.save_history(&history).expect("save history");
        storage.save_persona(&persona).expect("save persona");
        storage.save_theme(ThemeKind::Obsidian).expect("save theme");

        let reopened = Storage::on_disk(dir.path().join("data"));
        assert_eq!(reopened.load_history(), history);
        assert_eq!(reopened.load_persona(), persona);
        assert_eq!(reopened.load_theme(), ThemeKind::Obsidian);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("data").join(THEME_KEY)).expect("theme"),
            "obsidian"
        );
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, "[{\"id\":").expect("set");
        store.set(PERSONA_KEY, "{\"sarcasm\":-4}").expect("set");
        store.set(THEME_KEY, "vaporwave").expect("set");

        let storage = Storage::new(store);
        assert!(storage.load_history().is_empty());
        assert_eq!(storage.load_persona(), PersonaConfig::default());
        assert_eq!(storage.load_theme(), ThemeKind::Neon);
    }

    #[test]
    fn out_of_range_persona_levels_are_clamped() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                PERSONA_KEY,
                r#"{"sarcasm":180,"edge":50,"language":"Hindi","fastReply":false}"#,
            )
            .expect("set");
        let persona = Storage::new(store).load_persona();
        assert_eq!(persona.sarcasm, 100);
        assert_eq!(persona.edge, 50);
        assert_eq!(persona.language, "Hindi");
    }

    #[test]
    fn clearing_history_removes_the_slot_only() {
        let storage = Storage::in_memory();
        storage
            .save_history(&[Message::user("hello")])
            .expect("save history");
        storage.save_theme(ThemeKind::Obsidian).expect("save theme");

        storage.clear_history().expect("clear");
        storage.clear_history().expect("clearing twice is fine");
        assert!(storage.load_history().is_empty());
        assert_eq!(storage.load_theme(), ThemeKind::Obsidian);
    }

    #[test]
    fn history_blob_uses_the_documented_shape() {
        let store = Arc::new(MemoryStore::new());
        let storage = Storage::new(store.clone());
        let mut message = Message::user("hi");
        message.id = "m1".into();
        message.timestamp = 5;
        storage.save_history(&[message]).expect("save");

        let raw = store.get(HISTORY_KEY).expect("get").expect("present");
        assert_eq!(
            raw,
            r#"[{"id":"m1","role":"user","text":"hi","timestamp":5}]"#
        );
        assert_eq!(storage.load_history()[0].role, Role::User);
    }

    #[test]
    fn missing_file_store_directory_reads_as_empty() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStore::new(dir.path().join("absent"));
        assert_eq!(store.get(HISTORY_KEY).expect("get"), None);
        store.remove(HISTORY_KEY).expect("remove of missing key");
    }
}
