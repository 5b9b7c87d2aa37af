//! Persistent store
//!
//! Three JSON documents live in the store directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `config.json` | [`Config`] |
//! | `history.json` | [`History`] |
//! | `migration_backup.json` | [`MigrationBackup`], only while a migration can be rolled back |
//!
//! Reads never fail: a missing or malformed document is logged and replaced
//! by its default, and the next write overwrites it with a well-formed one.
//! Updates re-read the document from disk, apply the change, and write the
//! whole document back. There is no locking; of two concurrent writers the
//! last one wins.

use crate::config::Config;
use crate::error::Result;
use crate::history::History;
use crate::migrate::MigrationBackup;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const HISTORY_FILE: &str = "history.json";
const BACKUP_FILE: &str = "migration_backup.json";

/// Handle to the store directory.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Open the store, creating the directory and default documents if absent.
    ///
    /// Failing to create them is logged, not returned; later reads fall back
    /// to defaults.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let store = Self { dir: dir.into() };
        if let Err(e) = store.ensure_defaults() {
            tracing::warn!(dir = %store.dir.display(), error = %e, "Failed to initialize store");
        }
        store
    }

    /// Open the store at [`Config::store_dir`].
    pub fn open_default() -> Self {
        Self::open(Config::store_dir())
    }

    fn ensure_defaults(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        if !self.config_path().exists() {
            tracing::info!(path = %self.config_path().display(), "Creating default config");
            write_json(&self.config_path(), &Config::default())?;
        }
        if !self.history_path().exists() {
            write_json(&self.history_path(), &History::default())?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE)
    }

    pub fn load_config(&self) -> Config {
        read_or_default(&self.config_path())
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        write_json(&self.config_path(), config)
    }

    /// Read-modify-write the config document.
    pub fn update_config<R>(&self, f: impl FnOnce(&mut Config) -> Result<R>) -> Result<R> {
        let mut config = self.load_config();
        let out = f(&mut config)?;
        self.save_config(&config)?;
        Ok(out)
    }

    pub fn load_history(&self) -> History {
        read_or_default(&self.history_path())
    }

    pub fn save_history(&self, history: &History) -> Result<()> {
        write_json(&self.history_path(), history)
    }

    /// Read-modify-write the history document.
    pub fn update_history<R>(&self, f: impl FnOnce(&mut History) -> R) -> Result<R> {
        let mut history = self.load_history();
        let out = f(&mut history);
        self.save_history(&history)?;
        Ok(out)
    }

    /// The recorded migration, if any.
    ///
    /// Unlike the other documents a malformed backup is an error: silently
    /// treating it as absent would make a migration impossible to undo.
    pub fn load_backup(&self) -> Result<Option<MigrationBackup>> {
        let path = self.backup_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn save_backup(&self, backup: &MigrationBackup) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        write_json(&self.backup_path(), backup)
    }

    pub fn delete_backup(&self) -> Result<()> {
        match fs::remove_file(self.backup_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read store document");
            }
            return T::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed store document, using defaults");
            T::default()
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::Move;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_default_documents() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path().join("dojo"));

        assert!(store.config_path().exists());
        assert!(store.history_path().exists());
        assert!(!store.backup_path().exists());
        assert_eq!(store.load_config(), Config::default());
        assert_eq!(store.load_history(), History::default());
    }

    #[test]
    fn test_open_keeps_existing_documents() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), r#"{"theme": "dusk"}"#).unwrap();

        let store = Store::open(temp.path());
        assert_eq!(store.load_config().theme, "dusk");
    }

    #[test]
    fn test_corrupt_history_reads_as_empty_and_is_repaired() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path());
        fs::write(store.history_path(), "{ truncated").unwrap();

        assert_eq!(store.load_history(), History::default());

        store
            .update_history(|h| {
                h.add_favorite("lab/x");
            })
            .unwrap();
        let text = fs::read_to_string(store.history_path()).unwrap();
        let reparsed: History = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed.favorites, vec!["lab/x"]);
    }

    #[test]
    fn test_update_config_preserves_unknown_keys() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            r#"{"learning_mode": false, "plugin": {"enabled": true}}"#,
        )
        .unwrap();
        let store = Store::open(temp.path());

        store
            .update_config(|c| c.set("learning_mode", "true"))
            .unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.config_path()).unwrap()).unwrap();
        assert_eq!(doc["learning_mode"], true);
        assert_eq!(doc["plugin"]["enabled"], true);
    }

    #[test]
    fn test_failed_config_update_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path());
        let before = fs::read_to_string(store.config_path()).unwrap();

        assert!(store.update_config(|c| c.set("fuzzy_threshold", "x")).is_err());
        assert_eq!(fs::read_to_string(store.config_path()).unwrap(), before);
    }

    #[test]
    fn test_backup_lifecycle() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path());
        assert!(store.load_backup().unwrap().is_none());

        let backup = MigrationBackup {
            timestamp: chrono::Utc::now(),
            moves: vec![Move {
                from: "apps".into(),
                to: "work/apps".into(),
            }],
            created_dirs: vec![],
        };
        store.save_backup(&backup).unwrap();
        assert_eq!(store.load_backup().unwrap(), Some(backup));

        store.delete_backup().unwrap();
        assert!(store.load_backup().unwrap().is_none());
        store.delete_backup().unwrap();
    }
}
