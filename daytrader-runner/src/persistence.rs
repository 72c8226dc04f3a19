//! Ledger state persistence: JSON files on disk, or in memory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use daytrader_core::domain::LedgerSnapshot;
use tracing::debug;

use crate::collaborators::{CollaboratorError, Persistence};

/// One `{dir}/{account_id}.json` file per account holding a `LedgerSnapshot`.
#[derive(Debug, Clone)]
pub struct JsonStatePersistence {
    dir: PathBuf,
}

impl JsonStatePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, account_id: &str) -> PathBuf {
        self.dir.join(format!("{account_id}.json"))
    }
}

impl Persistence for JsonStatePersistence {
    fn load_state(&self, account_id: &str) -> Result<Option<LedgerSnapshot>, CollaboratorError> {
        let path = self.path_for(account_id);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CollaboratorError::Connectivity(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        let snapshot = serde_json::from_str(&json).map_err(|e| {
            CollaboratorError::DataUnavailable(format!("corrupt state file {}: {e}", path.display()))
        })?;
        debug!(account_id, path = %path.display(), "loaded ledger state");
        Ok(Some(snapshot))
    }

    fn save_state(&self, account_id: &str, state: &LedgerSnapshot) -> Result<(), CollaboratorError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CollaboratorError::Connectivity(format!("failed to create {}: {e}", self.dir.display()))
        })?;
        let path = self.path_for(account_id);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| CollaboratorError::DataUnavailable(format!("serialize state: {e}")))?;

        fs::write(&tmp_path, json).map_err(|e| {
            CollaboratorError::Connectivity(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CollaboratorError::Connectivity(format!("atomic rename failed: {e}"))
        })?;
        debug!(account_id, path = %path.display(), "saved ledger state");
        Ok(())
    }
}

/// In-process state store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    states: Mutex<HashMap<String, LedgerSnapshot>>,
    saves: Mutex<usize>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with existing state.
    pub fn with_state(self, account_id: &str, state: LedgerSnapshot) -> Self {
        if let Ok(mut states) = self.states.lock() {
            states.insert(account_id.to_string(), state);
        }
        self
    }

    /// Number of successful `save_state` calls.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn get(&self, account_id: &str) -> Option<LedgerSnapshot> {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(account_id).copied())
    }
}

impl Persistence for MemoryPersistence {
    fn load_state(&self, account_id: &str) -> Result<Option<LedgerSnapshot>, CollaboratorError> {
        let states = self
            .states
            .lock()
            .map_err(|_| CollaboratorError::Connectivity("state store poisoned".into()))?;
        Ok(states.get(account_id).copied())
    }

    fn save_state(&self, account_id: &str, state: &LedgerSnapshot) -> Result<(), CollaboratorError> {
        let mut states = self
            .states
            .lock()
            .map_err(|_| CollaboratorError::Connectivity("state store poisoned".into()))?;
        states.insert(account_id.to_string(), *state);
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LedgerSnapshot {
        LedgerSnapshot {
            cash: 47_500.0,
            holding_quantity: 0,
            average_cost: 0.0,
        }
    }

    #[test]
    fn json_absent_state_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStatePersistence::new(dir.path());
        assert_eq!(store.load_state("acct").unwrap(), None);
    }

    #[test]
    fn json_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStatePersistence::new(dir.path().join("nested"));
        store.save_state("acct", &snapshot()).unwrap();
        assert_eq!(store.load_state("acct").unwrap(), Some(snapshot()));
        assert!(!store.path_for("acct").with_extension("json.tmp").exists());
    }

    #[test]
    fn json_file_has_flat_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStatePersistence::new(dir.path());
        store.save_state("acct", &snapshot()).unwrap();
        let raw = fs::read_to_string(store.path_for("acct")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["cash"], 47_500.0);
        assert_eq!(value["holding_quantity"], 0);
        assert_eq!(value["average_cost"], 0.0);
    }

    #[test]
    fn json_corrupt_file_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStatePersistence::new(dir.path());
        fs::write(store.path_for("acct"), "{not json").unwrap();
        assert!(matches!(
            store.load_state("acct"),
            Err(CollaboratorError::DataUnavailable(_))
        ));
    }

    #[test]
    fn memory_counts_saves() {
        let store = MemoryPersistence::new();
        store.save_state("a", &snapshot()).unwrap();
        store.save_state("a", &snapshot()).unwrap();
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.get("a"), Some(snapshot()));
        assert_eq!(store.load_state("b").unwrap(), None);
    }
}
