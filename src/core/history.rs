//! Append-only history of aggregate mutations.
//!
//! Every mutating use case writes one record after its cascade completes.
//! Records are write-only from the engine's perspective; a failed append is
//! surfaced as an unexpected error and aborts the calling operation.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::error::CapworksError;
use crate::core::time;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub ts: String,
    pub actor: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    pub operation: String,
    #[serde(rename = "contentHash")]
    pub content_hash: String,
    pub payload: JsonValue,
}

impl HistoryRecord {
    pub fn new(
        actor: &str,
        entity_type: &str,
        entity_id: &str,
        operation: &str,
        payload: JsonValue,
    ) -> Self {
        Self {
            id: time::new_id(),
            ts: time::now_epoch_z(),
            actor: actor.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            operation: operation.to_string(),
            content_hash: content_hash_hex(&payload),
            payload,
        }
    }
}

/// Hex SHA-256 of the payload's canonical JSON encoding.
pub fn content_hash_hex(payload: &JsonValue) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{:x}", hasher.finalize())
}

/// JSONL appender for history records.
///
/// With no path attached, records accumulate in memory only (test and
/// scenario-file usage).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HistoryLog {
    #[serde(skip)]
    path: Option<PathBuf>,
    pub records: Vec<HistoryRecord>,
}

impl HistoryLog {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn at(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, record: HistoryRecord) -> Result<(), CapworksError> {
        if let Some(path) = &self.path {
            let line = serde_json::to_string(&record)
                .map_err(|e| CapworksError::UnexpectedError(e.to_string()))?;
            let mut f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(CapworksError::IoError)?;
            writeln!(f, "{}", line).map_err(CapworksError::IoError)?;
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
