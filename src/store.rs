//! Local record store
//!
//! A single JSON object on disk, keyed by string. The whole file is read on
//! open and rewritten on every save; there is one writer at a time.

use crate::history::{HistoryConfig, HistoryEntry, TransactionHistory};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const HISTORY_KEY: &str = "transactionHistory";
pub const PROFILE_KEY: &str = "userProfile";
pub const SETTINGS_KEY: &str = "userSettings";

/// String-keyed JSON record store
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    path: Option<PathBuf>,
    records: Map<String, Value>,
}

impl LocalStore {
    /// In-memory store that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store file; a missing file yields an empty store
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            debug!(path = %path.display(), "Store file not found, starting empty");
            Map::new()
        };

        Ok(Self {
            path: Some(path),
            records,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.records.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.records.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.records.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Set one field inside an object-valued record (profile, settings)
    pub fn set_field(&mut self, key: &str, field: &str, value: Value) {
        let record = self
            .records
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !record.is_object() {
            *record = Value::Object(Map::new());
        }
        if let Value::Object(fields) = record {
            fields.insert(field.to_string(), value);
        }
    }

    pub fn field(&self, key: &str, field: &str) -> Option<&Value> {
        self.records.get(key)?.get(field)
    }

    /// Load the transaction history
    pub fn history(&self, config: &HistoryConfig) -> crate::Result<TransactionHistory> {
        let entries: Vec<HistoryEntry> = match self.records.get(HISTORY_KEY) {
            Some(value) => serde_json::from_value(value.clone())?,
            None => Vec::new(),
        };
        Ok(TransactionHistory::from_entries(entries, config))
    }

    /// Replace the stored history with `history`
    pub fn save_history(&mut self, history: &TransactionHistory) -> crate::Result<()> {
        let value = serde_json::to_value(history.entries())?;
        self.records.insert(HISTORY_KEY.to_string(), value);
        self.save()
    }

    /// Rewrite the store file. In-memory stores are a no-op.
    pub fn save(&self) -> crate::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        // written beside the target, then renamed over it
        let text = serde_json::to_string_pretty(&self.records)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        info!(path = %path.display(), records = self.records.len(), "Store saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::Prediction;
    use crate::{Channel, FraudVerdict, TransactionInput};
    use chrono::NaiveDateTime;
    use serde_json::json;
    use tempfile::tempdir;

    fn create_test_input() -> TransactionInput {
        TransactionInput {
            amount: 250.0,
            kyc_verified: true,
            account_age_days: 60,
            channel: Channel::Atm,
            timestamp: NaiveDateTime::parse_from_str("2025-11-03T09:00:00", "%Y-%m-%dT%H:%M:%S")
                .unwrap(),
        }
    }

    fn create_prediction() -> Prediction {
        Prediction::fallback(
            FraudVerdict {
                is_fraud: false,
                risk_score: 0.2,
                rules_triggered: vec![],
                explanation: "Looks routine.".to_string(),
            },
            "offline",
        )
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json")).unwrap();
        assert_eq!(store.keys().count(), 0);
        assert!(store.history(&HistoryConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_history_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = LocalStore::open(&path).unwrap();
        let mut history = store.history(&HistoryConfig::default()).unwrap();
        for _ in 0..3 {
            history.record(&create_test_input(), &create_prediction());
        }
        store.save_history(&history).unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        let restored = reopened.history(&HistoryConfig::default()).unwrap();
        assert_eq!(restored, history);
    }

    #[test]
    fn test_profile_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set_field(PROFILE_KEY, "fullName", json!("Ada Analyst"));
        store.set_field(SETTINGS_KEY, "emailAlerts", json!(true));
        store.save().unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(
            reopened.field(PROFILE_KEY, "fullName"),
            Some(&json!("Ada Analyst"))
        );
        assert_eq!(reopened.field(SETTINGS_KEY, "emailAlerts"), Some(&json!(true)));
    }

    #[test]
    fn test_save_replaces_file_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set("first", json!(1));
        store.save().unwrap();
        store.set("second", json!(2));
        store.save().unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("store.json")]);

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get("first"), Some(&json!(1)));
        assert_eq!(reopened.get("second"), Some(&json!(2)));
    }

    #[test]
    fn test_set_field_replaces_non_object() {
        let mut store = LocalStore::in_memory();
        store.set(PROFILE_KEY, json!("legacy"));
        store.set_field(PROFILE_KEY, "theme", json!("dark"));
        assert_eq!(store.field(PROFILE_KEY, "theme"), Some(&json!("dark")));
        assert!(store.save().is_ok());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            LocalStore::open(&path),
            Err(crate::DashboardError::Json(_))
        ));
    }

    #[test]
    fn test_remove() {
        let mut store = LocalStore::in_memory();
        store.set("k", json!(1));
        assert_eq!(store.remove("k"), Some(json!(1)));
        assert!(store.get("k").is_none());
    }
}
