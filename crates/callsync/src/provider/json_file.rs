//! Call log read from a JSON export
//!
//! Lets the agent run off-device: a dump of the platform call-log table
//! (one object per row, platform type codes and all) is treated as the
//! provider. The file is re-read on every query so edits are picked up.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use super::CallLogProvider;
use crate::error::SyncError;
use crate::models::{CallLogEntry, CallType, SimSlot};

/// One row of a call-log export, using the platform's column semantics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedCall {
    pub id: i64,
    pub number: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Platform type code (1 = incoming, 2 = outgoing, ...)
    #[serde(rename = "type")]
    pub type_code: i32,
    /// Call start, millis since epoch
    pub date: i64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub phone_account_id: Option<String>,
}

impl ExportedCall {
    /// Convert to a domain entry. Rows with unknown type codes are dropped.
    pub fn into_entry(self) -> Option<CallLogEntry> {
        let Some(call_type) = CallType::from_platform_code(self.type_code) else {
            debug!("Skipping call {} with unknown type code {}", self.id, self.type_code);
            return None;
        };
        let slot = SimSlot::infer(self.phone_account_id.as_deref());
        let mut entry = CallLogEntry::new(self.id, self.number, call_type, self.date)
            .with_duration(self.duration)
            .with_sim_slot(slot);
        if let Some(name) = self.name {
            entry = entry.with_name(name);
        }
        Some(entry)
    }
}

/// Provider backed by a JSON array of [`ExportedCall`] rows
pub struct JsonCallLogFile {
    path: PathBuf,
}

impl JsonCallLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> Result<Vec<ExportedCall>, SyncError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Call log export {} not present yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(SyncError::PermissionDenied);
            }
            Err(e) => {
                return Err(SyncError::Unexpected(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            SyncError::Unexpected(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }
}

impl CallLogProvider for JsonCallLogFile {
    fn query_since(&self, since_millis: i64) -> Result<Vec<CallLogEntry>, SyncError> {
        Ok(self
            .read_rows()?
            .into_iter()
            .filter(|row| row.date > since_millis)
            .filter_map(ExportedCall::into_entry)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXPORT: &str = r#"[
        {"id": 1, "number": "+15550101", "name": "Alice", "type": 1, "date": 1000, "duration": 42, "phone_account_id": "1"},
        {"id": 2, "number": "+15550102", "type": 2, "date": 2000, "duration": 7, "phone_account_id": "2"},
        {"id": 3, "number": "+15550103", "type": 99, "date": 3000},
        {"id": 4, "number": "+15550104", "type": 3, "date": 4000}
    ]"#;

    #[test]
    fn test_reads_and_filters_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.json");
        std::fs::write(&path, EXPORT).unwrap();

        let provider = JsonCallLogFile::new(&path);
        let entries = provider.query_since(1000).unwrap();

        // id 1 is not newer than the floor, id 3 has an unknown type
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4"]);
        assert_eq!(entries[0].sim_slot, SimSlot::Sim2);
        assert_eq!(entries[0].duration_seconds, 7);
        assert_eq!(entries[1].call_type, CallType::Missed);
    }

    #[test]
    fn test_row_conversion_keeps_name_and_slot() {
        let rows: Vec<ExportedCall> = serde_json::from_str(EXPORT).unwrap();
        let entry = rows.into_iter().next().unwrap().into_entry().unwrap();
        assert_eq!(entry.name.as_deref(), Some("Alice"));
        assert_eq!(entry.sim_slot, SimSlot::Sim1);
        assert_eq!(entry.call_type, CallType::Incoming);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let provider = JsonCallLogFile::new(dir.path().join("absent.json"));
        assert!(provider.query_since(0).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_file_is_unexpected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.json");
        std::fs::write(&path, "[{").unwrap();
        let provider = JsonCallLogFile::new(&path);
        assert!(matches!(
            provider.query_since(0),
            Err(SyncError::Unexpected(_))
        ));
    }
}
