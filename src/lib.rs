//! snapwatch - Evidence-only freshness reporter
//!
//! Watches a single JSON snapshot written periodically by an external
//! capture job and reports whether it is fresh, without ever deriving
//! signals from its content.
//!
//! # Architecture
//!
//! Every poll is a short pass over local files:
//! - The snapshot timestamp is resolved from the best available source
//! - Its age is classified against a staleness limit
//! - The result is compared with the persisted state of the previous poll
//! - Evaluations and state changes go to an append-only audit log
//!
//! # Modules
//!
//! - `core`: Evaluation logic and storage ports
//! - `domain`: Data structures (Snapshot, EvaluationRecord, AuditEntry)
//! - `config`: YAML, environment and default settings
//! - `server`: axum HTTP API
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve /health, /latest and /status
//! snapwatch serve --bind 127.0.0.1:8000
//!
//! # Poll once
//! snapwatch status
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;

// Re-export main types at crate root for convenience
pub use crate::core::{EvidenceReporter, HealthProbe, ReporterSettings, StatusReport, Storage};
pub use crate::domain::{EvaluationRecord, PersistedState, Provenance, StateLabel};
