//! Evaluation results and the state carried between polls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::snapshot::{Provenance, ResolvedTimestamp};
use super::lenient;
use super::timefmt::iso_z_lenient;

/// Freshness label reported for a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateLabel {
    /// Snapshot age is within the staleness limit
    Ok,

    /// Snapshot is older than the staleness limit
    Stale,

    /// Snapshot could not be evaluated
    Error,
}

impl StateLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Stale => "STALE",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for StateLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a poll ends in `ERROR`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("Latest file not found: {0}")]
    SourceNotFound(String),

    #[error("Read failed: {0}")]
    SourceUnreadable(String),

    #[error("JSON parse failed: {0}")]
    SourceMalformed(String),

    #[error("Invalid JSON shape: expected object (dict)")]
    NotAnObject,

    #[error("No usable timestamp: expected snapshot_time_utc or generated_at_local or file mtime.")]
    NoUsableTimestamp,
}

/// Machine-readable class of an [`EvaluationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    SourceNotFound,
    SourceUnreadable,
    SourceMalformed,
    NoUsableTimestamp,
}

impl EvaluationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceNotFound(_) => ErrorKind::SourceNotFound,
            Self::SourceUnreadable(_) => ErrorKind::SourceUnreadable,
            Self::SourceMalformed(_) | Self::NotAnObject => ErrorKind::SourceMalformed,
            Self::NoUsableTimestamp => ErrorKind::NoUsableTimestamp,
        }
    }
}

/// Outcome of a single poll. Built once, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub polled_at: DateTime<Utc>,
    pub state: StateLabel,
    pub age_seconds: Option<i64>,
    /// `None` when the snapshot could not be loaded at all
    pub timestamp: Option<ResolvedTimestamp>,
    pub errors: Vec<String>,
}

impl EvaluationRecord {
    /// Successful classification
    pub fn classified(
        polled_at: DateTime<Utc>,
        state: StateLabel,
        age_seconds: i64,
        timestamp: ResolvedTimestamp,
    ) -> Self {
        Self {
            polled_at,
            state,
            age_seconds: Some(age_seconds),
            timestamp: Some(timestamp),
            errors: Vec::new(),
        }
    }

    /// Failed poll. `timestamp` is set when the snapshot loaded but no
    /// timestamp could be resolved.
    pub fn failed(
        polled_at: DateTime<Utc>,
        error: &EvaluationError,
        timestamp: Option<ResolvedTimestamp>,
    ) -> Self {
        Self {
            polled_at,
            state: StateLabel::Error,
            age_seconds: None,
            timestamp,
            errors: vec![error.to_string()],
        }
    }

    pub fn provenance(&self) -> Option<Provenance> {
        self.timestamp.map(|t| t.provenance())
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(|t| t.instant())
    }
}

/// Durable record of the last successful poll.
///
/// Only `state` is required when reading back. Every other field degrades
/// to its default when missing or malformed, so a partially damaged file
/// still yields the last known state and last change time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// When the poll ran
    #[serde(rename = "ts_utc", with = "iso_z_lenient", default)]
    pub polled_at: Option<DateTime<Utc>>,

    /// Last observed state
    pub state: StateLabel,

    #[serde(rename = "age_sec", default, deserialize_with = "lenient::or_default")]
    pub age_seconds: Option<i64>,

    #[serde(
        rename = "timestamp_source",
        default,
        deserialize_with = "lenient::or_default"
    )]
    pub provenance: Provenance,

    #[serde(rename = "timestamp_utc", with = "iso_z_lenient", default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Snapshot location at the time of the poll
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub file: String,

    /// When the last state change event was emitted
    #[serde(rename = "last_change_ts_utc", with = "iso_z_lenient", default)]
    pub last_change_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub version: String,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub pack_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_state_label_serialization() {
        assert_eq!(serde_json::to_string(&StateLabel::Stale).unwrap(), "\"STALE\"");
        let parsed: StateLabel = serde_json::from_str("\"OK\"").unwrap();
        assert_eq!(parsed, StateLabel::Ok);
    }

    #[test]
    fn test_error_messages_and_kinds() {
        let missing = EvaluationError::SourceNotFound("/data/latest.json".to_string());
        assert_eq!(missing.to_string(), "Latest file not found: /data/latest.json");
        assert_eq!(missing.kind(), ErrorKind::SourceNotFound);
        assert_eq!(EvaluationError::NotAnObject.kind(), ErrorKind::SourceMalformed);
        assert_eq!(
            serde_json::to_string(&ErrorKind::NoUsableTimestamp).unwrap(),
            "\"NO_USABLE_TIMESTAMP\""
        );
    }

    #[test]
    fn test_persisted_state_file_layout() {
        let state = PersistedState {
            polled_at: Some(Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap()),
            state: StateLabel::Ok,
            age_seconds: Some(120),
            provenance: Provenance::SnapshotField,
            timestamp: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 58, 0).unwrap()),
            file: "/data/latest.json".to_string(),
            last_change_at: None,
            version: "v2.0".to_string(),
            pack_id: "pack".to_string(),
        };

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["ts_utc"], "2026-01-01T01:00:00Z");
        assert_eq!(value["state"], "OK");
        assert_eq!(value["age_sec"], 120);
        assert_eq!(value["timestamp_source"], "snapshot_time_utc");
        assert_eq!(value["timestamp_utc"], "2026-01-01T00:58:00Z");
        assert!(value["last_change_ts_utc"].is_null());
    }

    #[test]
    fn test_persisted_state_tolerates_bad_last_change() {
        let parsed: PersistedState = serde_json::from_str(
            r#"{"state": "STALE", "last_change_ts_utc": "2026-01-01T00:00:00", "ts_utc": 5}"#,
        )
        .unwrap();
        assert_eq!(parsed.state, StateLabel::Stale);
        assert!(parsed.last_change_at.is_none());
        assert!(parsed.polled_at.is_none());
        assert_eq!(parsed.provenance, Provenance::None);
    }

    #[test]
    fn test_persisted_state_keeps_state_when_secondary_fields_are_damaged() {
        let parsed: PersistedState = serde_json::from_str(
            r#"{
                "state": "OK",
                "last_change_ts_utc": "2026-09-01T00:00:00Z",
                "timestamp_source": "legacy_label",
                "age_sec": "x",
                "file": 5,
                "version": ["v1"],
                "pack_id": null
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.state, StateLabel::Ok);
        assert_eq!(
            parsed.last_change_at,
            Some(Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parsed.provenance, Provenance::None);
        assert_eq!(parsed.age_seconds, None);
        assert_eq!(parsed.file, "");
        assert_eq!(parsed.version, "");
        assert_eq!(parsed.pack_id, "");
    }

    #[test]
    fn test_persisted_state_requires_valid_state() {
        assert!(serde_json::from_str::<PersistedState>(r#"{"state": "MAYBE"}"#).is_err());
        assert!(serde_json::from_str::<PersistedState>(r#"{"age_sec": 5}"#).is_err());
    }
}
