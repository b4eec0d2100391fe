//! Persistence backends for the ledger snapshot.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use rc_domain::error::{Error, Result};

use crate::model::{PostedRecord, Template};

/// Everything the ledger stores, as written to disk.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub records: Vec<PostedRecord>,
}

/// Where snapshots live.  `save` must either store the whole snapshot or
/// fail without leaving a partial one behind.
pub trait Persistence: Send + Sync {
    /// `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// JSON file
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pretty-printed JSON file, replaced atomically via a sibling temp file.
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Persistence for JsonFile {
    fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| {
            Error::Persistence(format!("parsing {}: {e}", self.path.display()))
        })?;
        tracing::info!(
            templates = snapshot.templates.len(),
            records = snapshot.records.len(),
            path = %self.path.display(),
            "ledger loaded"
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)
            .map_err(|e| Error::Persistence(format!("writing {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            Error::Persistence(format!("replacing {}: {e}", self.path.display()))
        })?;
        tracing::debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Keeps the last saved snapshot in memory. Used for previews and tests.
#[derive(Default)]
pub struct Memory {
    saved: Mutex<Option<Snapshot>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(snapshot: Snapshot) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
        }
    }

    /// The most recently saved snapshot.
    pub fn saved(&self) -> Option<Snapshot> {
        self.saved.lock().clone()
    }
}

impl Persistence for Memory {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.saved())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.saved.lock() = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("ledger.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let file = JsonFile::new(&path);
        file.save(&Snapshot::default()).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested").join("ledger.json.tmp").exists());
        assert_eq!(file.load().unwrap(), Some(Snapshot::default()));
    }

    #[test]
    fn corrupt_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFile::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn memory_returns_last_save() {
        let mem = Memory::new();
        assert!(mem.load().unwrap().is_none());
        mem.save(&Snapshot::default()).unwrap();
        assert_eq!(mem.load().unwrap(), Some(Snapshot::default()));
    }
}
