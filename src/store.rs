//! Report persistence keyed by (owner, report id).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{CombatEvent, ReportShell};

/// A report as persisted: its shell plus the full event list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub shell: ReportShell,
    pub events: Vec<CombatEvent>,
}

pub trait ReportStore: Send + Sync {
    fn insert(&self, report: Arc<StoredReport>) -> Result<(), StoreError>;

    fn fetch(&self, owner: &str, report_id: &str) -> Result<Option<Arc<StoredReport>>, StoreError>;

    /// Shells of every report uploaded by `owner`
    fn list(&self, owner: &str) -> Result<Vec<ReportShell>, StoreError>;

    /// Returns false when nothing was stored under the key
    fn delete(&self, owner: &str, report_id: &str) -> Result<bool, StoreError>;
}

/// Reject keys that could escape a directory or are empty
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains("..") || key.contains('/') || key.contains('\\') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ── In-memory ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    reports: RwLock<HashMap<(String, String), Arc<StoredReport>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for MemoryStore {
    fn insert(&self, report: Arc<StoredReport>) -> Result<(), StoreError> {
        validate_key(&report.shell.owner_id)?;
        validate_key(&report.shell.report_id)?;
        let key = (report.shell.owner_id.clone(), report.shell.report_id.clone());
        self.reports
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key, report);
        Ok(())
    }

    fn fetch(&self, owner: &str, report_id: &str) -> Result<Option<Arc<StoredReport>>, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::Poisoned)?;
        Ok(reports
            .get(&(owner.to_string(), report_id.to_string()))
            .cloned())
    }

    fn list(&self, owner: &str) -> Result<Vec<ReportShell>, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::Poisoned)?;
        let mut shells: Vec<ReportShell> = reports
            .iter()
            .filter(|((o, _), _)| o == owner)
            .map(|(_, r)| r.shell.clone())
            .collect();
        shells.sort_by(|a, b| a.report_name.cmp(&b.report_name).then(a.report_id.cmp(&b.report_id)));
        Ok(shells)
    }

    fn delete(&self, owner: &str, report_id: &str) -> Result<bool, StoreError> {
        let mut reports = self.reports.write().map_err(|_| StoreError::Poisoned)?;
        Ok(reports
            .remove(&(owner.to_string(), report_id.to_string()))
            .is_some())
    }
}

// ── JSON files ───────────────────────────────────────────────────────────────

/// One `<root>/<owner>/<report_id>.json` file per report
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonFileStore { root: root.into() }
    }

    fn owner_dir(&self, owner: &str) -> Result<PathBuf, StoreError> {
        validate_key(owner)?;
        Ok(self.root.join(owner))
    }

    fn report_path(&self, owner: &str, report_id: &str) -> Result<PathBuf, StoreError> {
        validate_key(report_id)?;
        Ok(self.owner_dir(owner)?.join(format!("{}.json", report_id)))
    }

    fn read(path: &Path) -> Result<StoredReport, StoreError> {
        let bytes = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ReportStore for JsonFileStore {
    fn insert(&self, report: Arc<StoredReport>) -> Result<(), StoreError> {
        let dir = self.owner_dir(&report.shell.owner_id)?;
        let path = self.report_path(&report.shell.owner_id, &report.shell.report_id)?;

        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let json = serde_json::to_vec(report.as_ref()).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), events = report.events.len(), "Stored report");
        Ok(())
    }

    fn fetch(&self, owner: &str, report_id: &str) -> Result<Option<Arc<StoredReport>>, StoreError> {
        let path = self.report_path(owner, report_id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(|r| Some(Arc::new(r)))
    }

    fn list(&self, owner: &str) -> Result<Vec<ReportShell>, StoreError> {
        let dir = self.owner_dir(owner)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut shells = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(report) => shells.push(report.shell),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable report file"),
            }
        }
        shells.sort_by(|a, b| a.report_name.cmp(&b.report_name).then(a.report_id.cmp(&b.report_id)));
        Ok(shells)
    }

    fn delete(&self, owner: &str, report_id: &str) -> Result<bool, StoreError> {
        let path = self.report_path(owner, report_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(owner: &str, id: &str, name: &str) -> Arc<StoredReport> {
        Arc::new(StoredReport {
            shell: ReportShell {
                report_id: id.to_string(),
                report_name: name.to_string(),
                file_name: "log.txt".to_string(),
                owner_id: owner.to_string(),
                event_count: 0,
            },
            events: Vec::new(),
        })
    }

    #[test]
    fn test_memory_store_is_keyed_by_owner() {
        let store = MemoryStore::new();
        store.insert(report("SYSTEM", "a", "Raid A")).unwrap();
        store.insert(report("other", "b", "Raid B")).unwrap();

        assert!(store.fetch("SYSTEM", "a").unwrap().is_some());
        assert!(store.fetch("other", "a").unwrap().is_none());

        let shells = store.list("SYSTEM").unwrap();
        assert_eq!(shells.len(), 1);
        assert_eq!(shells[0].report_id, "a");

        assert!(store.delete("SYSTEM", "a").unwrap());
        assert!(!store.delete("SYSTEM", "a").unwrap());
        assert!(store.fetch("SYSTEM", "a").unwrap().is_none());
    }

    #[test]
    fn test_keys_are_validated() {
        assert!(validate_key("3f2a-77").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("a\\b").is_err());

        let store = MemoryStore::new();
        assert!(matches!(
            store.insert(report("SYSTEM", "../x", "Bad")),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
