use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hive_core::{HiveError, Result, StateView};
use tracing::{debug, warn};

/// Durable name → result hand-off between pipeline steps.
///
/// The whole mapping lives in memory and is rewritten to a single JSON file
/// on every mutation.
#[derive(Debug)]
pub struct SharedStateStore {
    path: PathBuf,
    entries: BTreeMap<String, serde_json::Value>,
}

impl SharedStateStore {
    /// Open the snapshot at `path`. A missing, unreadable, or corrupt file
    /// yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Shared state is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Shared state unreadable, starting empty");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened shared state");
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Store a result and rewrite the snapshot. When the write fails the
    /// previous entry is restored.
    pub fn set(&mut self, name: impl Into<String>, value: serde_json::Value) -> Result<()> {
        let name = name.into();
        let previous = self.entries.insert(name.clone(), value);
        if let Err(e) = self.persist() {
            match previous {
                Some(old) => self.entries.insert(name, old),
                None => self.entries.remove(&name),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove one entry. Returns whether it existed.
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        let Some(old) = self.entries.remove(name) else {
            return Ok(false);
        };
        if let Err(e) = self.persist() {
            self.entries.insert(name.to_string(), old);
            return Err(e);
        }
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<()> {
        let old = std::mem::take(&mut self.entries);
        if let Err(e) = self.persist() {
            self.entries = old;
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json).map_err(|e| {
            HiveError::State(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl StateView for SharedStateStore {
    fn get(&self, name: &str) -> Option<&serde_json::Value> {
        SharedStateStore::get(self, name)
    }
}
