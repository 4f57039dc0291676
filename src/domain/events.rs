//! Audit log entries.
//!
//! Every poll appends one entry; a detected state change appends a second
//! one sharing the same `poll_id`. Entries are never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::evaluation::{ErrorKind, EvaluationError, EvaluationRecord, StateLabel};
use super::identity::Identity;
use super::snapshot::Provenance;
use super::timefmt::{iso_z, iso_z_lenient};

/// A single line in the audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// Groups the entries written by one poll
    pub poll_id: Uuid,

    /// When the poll ran
    #[serde(rename = "ts_utc", with = "iso_z")]
    pub timestamp: DateTime<Utc>,

    /// Operation that produced the entry (`/status`, `/latest`)
    pub endpoint: String,

    /// Snapshot location
    pub file: String,

    pub version: String,
    pub pack_id: String,

    #[serde(flatten)]
    pub event: AuditEvent,
}

/// What the entry records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    /// Outcome of a status evaluation
    Evaluation {
        state: StateLabel,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        age_sec: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp_source: Option<Provenance>,
        #[serde(
            with = "iso_z_lenient",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        timestamp_utc: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
    },

    /// The observed state differs from the persisted one and the cooldown
    /// allowed an announcement
    StateChanged {
        from: Option<StateLabel>,
        to: StateLabel,
        age_sec: i64,
        timestamp_source: Provenance,
        #[serde(with = "iso_z_lenient", default)]
        timestamp_utc: Option<DateTime<Utc>>,
    },

    /// A raw passthrough read of the snapshot
    LatestRead {
        state: StateLabel,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
    },
}

impl AuditEntry {
    /// Create an entry stamped with the deployment identity
    pub fn new(
        poll_id: Uuid,
        timestamp: DateTime<Utc>,
        endpoint: &str,
        file: &str,
        identity: &Identity,
        event: AuditEvent,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            poll_id,
            timestamp,
            endpoint: endpoint.to_string(),
            file: file.to_string(),
            version: identity.version.clone(),
            pack_id: identity.pack_id.clone(),
            event,
        }
    }
}

impl AuditEvent {
    /// Evaluation entry for a finished record
    pub fn evaluation(record: &EvaluationRecord, error: Option<&EvaluationError>) -> Self {
        Self::Evaluation {
            state: record.state,
            age_sec: record.age_seconds,
            timestamp_source: record.provenance().filter(|p| *p != Provenance::None),
            timestamp_utc: record.instant(),
            error: error.map(|e| e.to_string()),
            error_kind: error.map(|e| e.kind()),
        }
    }

    /// Transition entry
    pub fn state_changed(from: Option<StateLabel>, record: &EvaluationRecord) -> Self {
        Self::StateChanged {
            from,
            to: record.state,
            age_sec: record.age_seconds.unwrap_or_default(),
            timestamp_source: record.provenance().unwrap_or_default(),
            timestamp_utc: record.instant(),
        }
    }

    /// Passthrough read entry
    pub fn latest_read(error: Option<&EvaluationError>) -> Self {
        Self::LatestRead {
            state: if error.is_some() {
                StateLabel::Error
            } else {
                StateLabel::Ok
            },
            error: error.map(|e| e.to_string()),
            error_kind: error.map(|e| e.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::ResolvedTimestamp;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_evaluation_entry_layout() {
        let record = EvaluationRecord::classified(
            now(),
            StateLabel::Ok,
            100,
            ResolvedTimestamp::found(now() - chrono::Duration::seconds(100), Provenance::SnapshotField),
        );
        let entry = AuditEntry::new(
            Uuid::new_v4(),
            now(),
            "/status",
            "/data/latest.json",
            &Identity::default(),
            AuditEvent::evaluation(&record, None),
        );

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["event"], "EVALUATION");
        assert_eq!(value["ts_utc"], "2026-02-01T08:00:00Z");
        assert_eq!(value["state"], "OK");
        assert_eq!(value["age_sec"], 100);
        assert_eq!(value["timestamp_source"], "snapshot_time_utc");
        assert_eq!(value["timestamp_utc"], "2026-02-01T07:58:20Z");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_state_changed_entry_keeps_null_from() {
        let record = EvaluationRecord::classified(
            now(),
            StateLabel::Stale,
            9000,
            ResolvedTimestamp::found(now(), Provenance::FileModifiedTime),
        );
        let event = AuditEvent::state_changed(None, &record);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "STATE_CHANGED");
        assert!(value["from"].is_null());
        assert_eq!(value["to"], "STALE");
        assert_eq!(value["timestamp_source"], "file_mtime");
    }

    #[test]
    fn test_error_entry_carries_kind() {
        let err = EvaluationError::SourceNotFound("/data/latest.json".to_string());
        let record = EvaluationRecord::failed(now(), &err, None);

        let value = serde_json::to_value(AuditEvent::evaluation(&record, Some(&err))).unwrap();
        assert_eq!(value["state"], "ERROR");
        assert_eq!(value["error_kind"], "SOURCE_NOT_FOUND");
        assert_eq!(value["error"], "Latest file not found: /data/latest.json");
        assert!(value.get("timestamp_source").is_none());
    }
}
