//! Timestamp, id, and audit-stamp helpers shared by every mutating operation.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_id() -> String {
    Ulid::new().to_string()
}

/// Creation stamp carried by decisions and history records.
///
/// The actor is always passed in explicitly by the caller; there is no
/// ambient "current user" anywhere in the crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
}

impl Audit {
    pub fn stamp(actor: &str) -> Self {
        Self {
            created_at: now_epoch_z(),
            created_by: actor.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_epoch_z_format() {
        let result = now_epoch_z();
        assert!(result.ends_with('Z'));
        let numeric_part = result.trim_end_matches('Z');
        assert!(numeric_part.parse::<u64>().is_ok());
    }

    #[test]
    fn test_new_id_is_unique_ulid() {
        let id1 = new_id();
        let id2 = new_id();
        assert_ne!(id1, id2);
        assert!(Ulid::from_string(&id1).is_ok());
    }

    #[test]
    fn test_audit_stamp_carries_actor() {
        let audit = Audit::stamp("planner-1");
        assert_eq!(audit.created_by, "planner-1");
        assert!(audit.created_at.ends_with('Z'));
    }
}
