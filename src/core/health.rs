//! Liveness/readiness checks and basic metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::StateLabel;

use super::ports::Storage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthChecks {
    pub latest_file_exists: bool,
    pub audit_dir_writable: bool,
    pub state_dir_writable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthMetrics {
    /// Whole seconds since the process started
    pub uptime_sec: i64,
    /// Lines in the audit log, -1 if it cannot be read
    pub audit_lines: i64,
    /// State recorded by the last successful poll
    pub last_state: Option<StateLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: StateLabel,
    pub checks: HealthChecks,
    pub metrics: HealthMetrics,
}

/// Read-only probe over the deployment's storage
#[derive(Clone)]
pub struct HealthProbe {
    storage: Storage,
    started_at: DateTime<Utc>,
}

impl HealthProbe {
    pub fn new(storage: Storage, started_at: DateTime<Utc>) -> Self {
        Self {
            storage,
            started_at,
        }
    }

    pub async fn check(&self) -> HealthReport {
        self.check_at(Utc::now()).await
    }

    pub async fn check_at(&self, now: DateTime<Utc>) -> HealthReport {
        let checks = HealthChecks {
            latest_file_exists: self.storage.source.exists().await,
            audit_dir_writable: self.storage.audit.ensure_writable().await.is_ok(),
            state_dir_writable: self.storage.state.ensure_writable().await.is_ok(),
        };

        let status = if checks.latest_file_exists
            && checks.audit_dir_writable
            && checks.state_dir_writable
        {
            StateLabel::Ok
        } else {
            StateLabel::Error
        };

        let audit_lines = match self.storage.audit.line_count().await {
            Ok(count) => i64::try_from(count).unwrap_or(i64::MAX),
            Err(_) => -1,
        };

        let metrics = HealthMetrics {
            uptime_sec: (now - self.started_at).num_seconds(),
            audit_lines,
            last_state: self.storage.state.load().await.map(|s| s.state),
        };

        HealthReport {
            status,
            checks,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::{MemoryAuditSink, MemorySnapshotSource, MemoryStateStore};
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_healthy_deployment() {
        let storage = Storage::new(
            Arc::new(MemorySnapshotSource::new(Some("{}"), None)),
            Arc::new(MemoryAuditSink::new()),
            Arc::new(MemoryStateStore::new()),
        );
        let started = Utc::now();
        let report = HealthProbe::new(storage, started)
            .check_at(started + Duration::seconds(42))
            .await;

        assert_eq!(report.status, StateLabel::Ok);
        assert_eq!(report.metrics.uptime_sec, 42);
        assert_eq!(report.metrics.audit_lines, 0);
        assert_eq!(report.metrics.last_state, None);
    }

    #[tokio::test]
    async fn test_missing_snapshot_or_unwritable_dir_is_error() {
        let storage = Storage::new(
            Arc::new(MemorySnapshotSource::new(None, None)),
            Arc::new(MemoryAuditSink::new()),
            Arc::new(MemoryStateStore::failing()),
        );
        let report = HealthProbe::new(storage, Utc::now()).check().await;

        assert_eq!(report.status, StateLabel::Error);
        assert!(!report.checks.latest_file_exists);
        assert!(report.checks.audit_dir_writable);
        assert!(!report.checks.state_dir_writable);
    }

    #[tokio::test]
    async fn test_unreadable_audit_log_counts_minus_one() {
        let storage = Storage::new(
            Arc::new(MemorySnapshotSource::new(Some("{}"), None)),
            Arc::new(MemoryAuditSink::unreadable()),
            Arc::new(MemoryStateStore::new()),
        );
        let report = HealthProbe::new(storage, Utc::now()).check().await;

        assert_eq!(report.metrics.audit_lines, -1);
        // Counting is a metric, not a readiness check
        assert_eq!(report.status, StateLabel::Ok);
    }
}
