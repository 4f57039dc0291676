//! The snapshot document and the timestamp derived from it.
//!
//! The snapshot is produced by an external capture job. snapwatch never
//! writes it and makes no assumption about its shape beyond "JSON object".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::evaluation::EvaluationError;

/// Field holding an ISO-8601 timestamp with explicit offset
pub const SNAPSHOT_TIME_FIELD: &str = "snapshot_time_utc";

/// Field holding a `YYYY-MM-DD HH:MM:SS` wall-clock time in the local offset
pub const LOCAL_TIME_FIELD: &str = "generated_at_local";

/// A parsed snapshot document (always a JSON object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    /// Wrap an already-parsed JSON object
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Parse snapshot text, rejecting anything that is not a JSON object
    pub fn from_json(text: &str) -> Result<Self, EvaluationError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| EvaluationError::SourceMalformed(e.to_string()))?;

        match value {
            Value::Object(fields) => Ok(Self(fields)),
            _ => Err(EvaluationError::NotAnObject),
        }
    }

    /// Look up a raw field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `snapshot_time_utc` if it is a non-empty string
    pub fn snapshot_time_utc(&self) -> Option<&str> {
        self.non_empty_str(SNAPSHOT_TIME_FIELD)
    }

    /// `generated_at_local` if it is a non-empty string
    pub fn generated_at_local(&self) -> Option<&str> {
        self.non_empty_str(LOCAL_TIME_FIELD)
    }

    /// Fields copied verbatim into the status evidence block
    pub fn passthrough(&self) -> Passthrough {
        let field = |key: &str| self.get(key).cloned().unwrap_or(Value::Null);
        Passthrough {
            timeframe: field("timeframe"),
            window_candles: field("window_candles"),
            source: field("source"),
        }
    }

    /// The underlying object
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Snapshot fields reported alongside the evidence, `null` when absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passthrough {
    pub timeframe: Value,
    pub window_candles: Value,
    pub source: Value,
}

/// Which source supplied the resolved timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Provenance {
    /// `snapshot_time_utc` field
    #[serde(rename = "snapshot_time_utc")]
    SnapshotField,

    /// `generated_at_local` field, read in the configured local offset
    #[serde(rename = "generated_at_local")]
    LocalField,

    /// Modification time of the snapshot file
    #[serde(rename = "file_mtime")]
    FileModifiedTime,

    /// Nothing usable
    #[default]
    #[serde(rename = "none")]
    None,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SnapshotField => "snapshot_time_utc",
            Self::LocalField => "generated_at_local",
            Self::FileModifiedTime => "file_mtime",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort timestamp for a snapshot.
///
/// `instant` is `None` exactly when `provenance` is [`Provenance::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    instant: Option<DateTime<Utc>>,
    provenance: Provenance,
}

impl ResolvedTimestamp {
    /// A timestamp found in one of the real sources
    pub fn found(instant: DateTime<Utc>, provenance: Provenance) -> Self {
        debug_assert!(provenance != Provenance::None);
        Self {
            instant: Some(instant),
            provenance,
        }
    }

    /// No source produced a timestamp
    pub fn unresolved() -> Self {
        Self {
            instant: None,
            provenance: Provenance::None,
        }
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_resolved(&self) -> bool {
        self.instant.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_object() {
        let snapshot =
            Snapshot::from_json(r#"{"snapshot_time_utc": "2026-01-01T00:00:00Z", "timeframe": "1h"}"#)
                .unwrap();
        assert_eq!(snapshot.snapshot_time_utc(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(snapshot.passthrough().timeframe, Value::from("1h"));
        assert_eq!(snapshot.passthrough().source, Value::Null);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert_eq!(
            Snapshot::from_json("[1, 2, 3]").unwrap_err(),
            EvaluationError::NotAnObject
        );
        assert!(matches!(
            Snapshot::from_json("{not json").unwrap_err(),
            EvaluationError::SourceMalformed(_)
        ));
    }

    #[test]
    fn test_non_string_and_empty_fields_are_ignored() {
        let snapshot =
            Snapshot::from_json(r#"{"snapshot_time_utc": 1700000000, "generated_at_local": ""}"#)
                .unwrap();
        assert!(snapshot.snapshot_time_utc().is_none());
        assert!(snapshot.generated_at_local().is_none());
    }

    #[test]
    fn test_provenance_labels() {
        assert_eq!(
            serde_json::to_string(&Provenance::FileModifiedTime).unwrap(),
            "\"file_mtime\""
        );
        assert_eq!(Provenance::SnapshotField.to_string(), "snapshot_time_utc");
        assert_eq!(Provenance::default(), Provenance::None);
    }
}
