//! Core evaluation logic.
//!
//! This module contains:
//! - Ports: storage seams (snapshot source, audit sink, state store)
//! - TimestampResolver / StalenessClassifier / StateTransitionTracker
//! - AuditRecorder: best-effort append-only logging
//! - EvidenceReporter: one poll end to end
//! - HealthProbe: readiness checks and metrics

pub mod audit;
pub mod best_effort;
pub mod classifier;
pub mod file_store;
pub mod health;
pub mod memory;
pub mod ports;
pub mod reporter;
pub mod resolver;
pub mod tracker;

// Re-export commonly used types
pub use audit::AuditRecorder;
pub use best_effort::BestEffort;
pub use classifier::{StalenessClassifier, Thresholds};
pub use file_store::{file_storage, FileSnapshotSource, JsonStateStore, JsonlAuditSink};
pub use health::{HealthChecks, HealthMetrics, HealthProbe, HealthReport};
pub use ports::{AuditSink, SnapshotSource, StateStore, Storage};
pub use reporter::{Evidence, EvidenceReporter, LatestReport, ReporterSettings, StatusReport};
pub use resolver::TimestampResolver;
pub use tracker::{StateTransitionTracker, TransitionDecision};
