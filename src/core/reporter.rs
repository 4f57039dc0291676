//! One poll of the snapshot: load, resolve, classify, track, audit, persist.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::timefmt::iso_z_lenient;
use crate::domain::{
    AuditEntry, AuditEvent, EvaluationError, EvaluationRecord, Identity, Passthrough,
    PersistedState, Provenance, Snapshot, StateLabel,
};

use super::audit::AuditRecorder;
use super::best_effort::BestEffort;
use super::classifier::{StalenessClassifier, Thresholds};
use super::ports::Storage;
use super::resolver::{default_local_offset, TimestampResolver};
use super::tracker::StateTransitionTracker;

pub const STATUS_ENDPOINT: &str = "/status";
pub const LATEST_ENDPOINT: &str = "/latest";

const STATUS_NOTES: &str = "Evidence-only. No signals.";
const LATEST_FOOTER: &str = "🛡️ Canon · Evidence-only · Audit-ready";

/// Tunables of the reporter
#[derive(Debug, Clone)]
pub struct ReporterSettings {
    pub thresholds: Thresholds,
    /// Offset of `generated_at_local`
    pub local_offset: FixedOffset,
    pub identity: Identity,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            local_offset: default_local_offset(),
            identity: Identity::default(),
        }
    }
}

/// Evidence block of a status report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    pub timestamp_source: Option<Provenance>,
    #[serde(with = "iso_z_lenient")]
    pub timestamp_utc: Option<DateTime<Utc>>,
    pub age_sec: Option<i64>,
    pub expected_interval_sec: i64,
    pub staleness_limit_sec: i64,
    /// Present once the snapshot has been parsed
    #[serde(flatten)]
    pub passthrough: Option<Passthrough>,
}

/// Result of a status poll
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: StateLabel,
    pub file: String,
    pub evidence: Evidence,
    pub notes: &'static str,
    pub errors: Vec<String>,

    /// The evaluation behind this report
    #[serde(skip)]
    pub record: EvaluationRecord,

    /// Whether this poll announced a state change
    #[serde(skip)]
    pub transition_emitted: bool,

    /// Outcome of the state write, `None` when no write was attempted
    #[serde(skip)]
    pub persisted: Option<BestEffort>,
}

/// Result of a raw snapshot read
#[derive(Debug, Clone, Serialize)]
pub struct LatestReport {
    pub status: StateLabel,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Snapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canon_footer: Option<&'static str>,
}

/// Produces freshness evidence for the configured snapshot
pub struct EvidenceReporter {
    storage: Storage,
    audit: AuditRecorder,
    resolver: TimestampResolver,
    classifier: StalenessClassifier,
    tracker: StateTransitionTracker,
    settings: ReporterSettings,
}

impl EvidenceReporter {
    pub fn new(storage: Storage, settings: ReporterSettings) -> Self {
        Self {
            audit: AuditRecorder::new(storage.audit.clone()),
            resolver: TimestampResolver::new(settings.local_offset),
            classifier: StalenessClassifier::new(&settings.thresholds),
            tracker: StateTransitionTracker::new(settings.thresholds.state_change_cooldown_seconds),
            storage,
            settings,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn settings(&self) -> &ReporterSettings {
        &self.settings
    }

    /// Poll the snapshot now
    pub async fn status(&self) -> StatusReport {
        self.status_at(Utc::now()).await
    }

    /// Poll the snapshot as of `now`
    #[instrument(skip(self), fields(file = %self.storage.source.location()))]
    pub async fn status_at(&self, now: DateTime<Utc>) -> StatusReport {
        let poll_id = Uuid::new_v4();

        let snapshot = match self.storage.source.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(error = %e, "Snapshot unavailable");
                let record = EvaluationRecord::failed(now, &e, None);
                self.record_evaluation(poll_id, &record, Some(&e)).await;
                return self.report(record, None, false, None);
            }
        };

        let resolved = self
            .resolver
            .resolve(&snapshot, self.storage.source.as_ref())
            .await;

        let Some(instant) = resolved.instant() else {
            let e = EvaluationError::NoUsableTimestamp;
            let record = EvaluationRecord::failed(now, &e, Some(resolved));
            self.record_evaluation(poll_id, &record, Some(&e)).await;
            return self.report(record, Some(snapshot.passthrough()), false, None);
        };

        let (state, age_seconds) = self.classifier.classify(instant, now);
        let record = EvaluationRecord::classified(now, state, age_seconds, resolved);
        debug!(%state, age_seconds, provenance = %resolved.provenance(), "Snapshot classified");

        let previous = self.storage.state.load().await;
        let decision = self.tracker.evaluate(previous.as_ref(), state, now);

        self.record_evaluation(poll_id, &record, None).await;

        if decision.emit {
            info!(
                from = ?decision.from,
                to = %state,
                "Snapshot state changed"
            );
            let entry = self.audit_entry(
                poll_id,
                now,
                STATUS_ENDPOINT,
                AuditEvent::state_changed(decision.from, &record),
            );
            self.audit.record(&entry).await;
        }

        let persisted = PersistedState {
            polled_at: Some(now),
            state,
            age_seconds: Some(age_seconds),
            provenance: resolved.provenance(),
            timestamp: Some(instant),
            file: self.storage.source.location(),
            last_change_at: decision.last_change_at,
            version: self.settings.identity.version.clone(),
            pack_id: self.settings.identity.pack_id.clone(),
        };
        let saved = BestEffort::from_result(self.storage.state.save(&persisted).await);
        if let BestEffort::Swallowed { reason } = &saved {
            debug!(%reason, "State write dropped");
        }

        self.report(
            record,
            Some(snapshot.passthrough()),
            decision.emit,
            Some(saved),
        )
    }

    /// Return the snapshot verbatim
    pub async fn latest(&self) -> LatestReport {
        self.latest_at(Utc::now()).await
    }

    pub async fn latest_at(&self, now: DateTime<Utc>) -> LatestReport {
        let file = self.storage.source.location();
        let result = self.storage.source.load().await;

        let event = AuditEvent::latest_read(result.as_ref().err());
        let entry = self.audit_entry(Uuid::new_v4(), now, LATEST_ENDPOINT, event);
        self.audit.record(&entry).await;

        match result {
            Ok(snapshot) => LatestReport {
                status: StateLabel::Ok,
                file,
                data: Some(snapshot),
                error: None,
                canon_footer: Some(LATEST_FOOTER),
            },
            Err(e) => LatestReport {
                status: StateLabel::Error,
                file,
                data: None,
                error: Some(e.to_string()),
                canon_footer: None,
            },
        }
    }

    async fn record_evaluation(
        &self,
        poll_id: Uuid,
        record: &EvaluationRecord,
        error: Option<&EvaluationError>,
    ) -> BestEffort {
        let entry = self.audit_entry(
            poll_id,
            record.polled_at,
            STATUS_ENDPOINT,
            AuditEvent::evaluation(record, error),
        );
        self.audit.record(&entry).await
    }

    fn audit_entry(
        &self,
        poll_id: Uuid,
        now: DateTime<Utc>,
        endpoint: &str,
        event: AuditEvent,
    ) -> AuditEntry {
        AuditEntry::new(
            poll_id,
            now,
            endpoint,
            &self.storage.source.location(),
            &self.settings.identity,
            event,
        )
    }

    fn report(
        &self,
        record: EvaluationRecord,
        passthrough: Option<Passthrough>,
        transition_emitted: bool,
        persisted: Option<BestEffort>,
    ) -> StatusReport {
        let thresholds = &self.settings.thresholds;
        StatusReport {
            state: record.state,
            file: self.storage.source.location(),
            evidence: Evidence {
                timestamp_source: record.provenance(),
                timestamp_utc: record.instant(),
                age_sec: record.age_seconds,
                expected_interval_sec: thresholds.expected_interval_seconds,
                staleness_limit_sec: thresholds.staleness_limit_seconds,
                passthrough,
            },
            notes: STATUS_NOTES,
            errors: record.errors.clone(),
            record,
            transition_emitted,
            persisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::{MemoryAuditSink, MemorySnapshotSource, MemoryStateStore};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    struct Fixture {
        source: Arc<MemorySnapshotSource>,
        audit: Arc<MemoryAuditSink>,
        state: Arc<MemoryStateStore>,
        reporter: EvidenceReporter,
    }

    fn fixture(text: Option<&str>, state: MemoryStateStore) -> Fixture {
        let source = Arc::new(MemorySnapshotSource::new(text, None));
        let audit = Arc::new(MemoryAuditSink::new());
        let state = Arc::new(state);
        let storage = Storage::new(source.clone(), audit.clone(), state.clone());
        Fixture {
            source,
            audit,
            state,
            reporter: EvidenceReporter::new(storage, ReporterSettings::default()),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 6, 0, 0).unwrap()
    }

    fn snapshot_at(dt: DateTime<Utc>) -> String {
        format!(
            r#"{{"snapshot_time_utc": "{}", "timeframe": "1h", "window_candles": 48, "source": "capture"}}"#,
            crate::domain::timefmt::format_iso_z(&dt)
        )
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_error_without_state_write() {
        let f = fixture(None, MemoryStateStore::new());

        let report = f.reporter.status_at(now()).await;
        assert_eq!(report.state, StateLabel::Error);
        assert_eq!(report.errors, vec!["Latest file not found: memory://snapshot"]);
        assert!(report.evidence.timestamp_source.is_none());
        assert!(report.evidence.passthrough.is_none());
        assert!(report.persisted.is_none());
        assert_eq!(f.state.save_count(), 0);

        let entries = f.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["state"], "ERROR");
        assert_eq!(entries[0]["error_kind"], "SOURCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_fresh_snapshot_reports_ok() {
        let text = snapshot_at(now() - Duration::seconds(100));
        let f = fixture(Some(&text), MemoryStateStore::new());

        let report = f.reporter.status_at(now()).await;
        assert_eq!(report.state, StateLabel::Ok);
        assert_eq!(report.evidence.age_sec, Some(100));
        assert_eq!(report.evidence.timestamp_source, Some(Provenance::SnapshotField));
        assert_eq!(report.evidence.staleness_limit_sec, 7200);
        assert_eq!(report.evidence.expected_interval_sec, 3600);
        assert!(report.errors.is_empty());

        let passthrough = report.evidence.passthrough.as_ref().unwrap();
        assert_eq!(passthrough.window_candles, 48);
        assert_eq!(passthrough.source, "capture");
    }

    #[tokio::test]
    async fn test_first_poll_emits_transition_and_persists() {
        let text = snapshot_at(now() - Duration::seconds(100));
        let f = fixture(Some(&text), MemoryStateStore::new());

        let report = f.reporter.status_at(now()).await;
        assert!(report.transition_emitted);
        assert_eq!(report.persisted, Some(BestEffort::Written));

        let entries = f.audit.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["event"], "EVALUATION");
        assert_eq!(entries[1]["event"], "STATE_CHANGED");
        assert!(entries[1]["from"].is_null());
        assert_eq!(entries[1]["to"], "OK");
        assert_eq!(entries[0]["poll_id"], entries[1]["poll_id"]);

        let saved = f.state.current().unwrap();
        assert_eq!(saved.state, StateLabel::Ok);
        assert_eq!(saved.last_change_at, Some(now()));
        assert_eq!(saved.file, "memory://snapshot");
    }

    #[tokio::test]
    async fn test_unresolvable_timestamp_leaves_state_untouched() {
        let f = fixture(Some(r#"{"timeframe": "1h"}"#), MemoryStateStore::new());

        let report = f.reporter.status_at(now()).await;
        assert_eq!(report.state, StateLabel::Error);
        assert_eq!(report.evidence.timestamp_source, Some(Provenance::None));
        assert_eq!(
            report.errors,
            vec!["No usable timestamp: expected snapshot_time_utc or generated_at_local or file mtime."]
        );
        assert_eq!(report.evidence.passthrough.as_ref().unwrap().timeframe, "1h");
        assert_eq!(f.state.save_count(), 0);
        assert_eq!(f.audit.entries()[0]["error_kind"], "NO_USABLE_TIMESTAMP");
    }

    #[tokio::test]
    async fn test_failing_state_store_does_not_fail_poll() {
        let text = snapshot_at(now() - Duration::seconds(10_000));
        let f = fixture(Some(&text), MemoryStateStore::failing());

        let report = f.reporter.status_at(now()).await;
        assert_eq!(report.state, StateLabel::Stale);
        assert!(matches!(report.persisted, Some(BestEffort::Swallowed { .. })));
    }

    #[tokio::test]
    async fn test_latest_passthrough_and_error() {
        let f = fixture(Some(r#"{"a": 1}"#), MemoryStateStore::new());

        let report = f.reporter.latest_at(now()).await;
        assert_eq!(report.status, StateLabel::Ok);
        assert_eq!(report.data.unwrap().get("a").unwrap(), 1);

        f.source.set_text(Some("[]"));
        let report = f.reporter.latest_at(now()).await;
        assert_eq!(report.status, StateLabel::Error);
        assert_eq!(
            report.error.as_deref(),
            Some("Invalid JSON shape: expected object (dict)")
        );

        let entries = f.audit.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["event"], "LATEST_READ");
        assert_eq!(entries[1]["state"], "ERROR");
        assert_eq!(f.state.save_count(), 0);
    }
}
