//! Domain types for snapwatch.
//!
//! This module contains the core data structures:
//! - Snapshot: the externally produced document and its resolved timestamp
//! - Evaluation: per-poll results and the state persisted between polls
//! - Events: append-only audit entries
//! - Identity: the deployment header stamped on every output

pub mod evaluation;
pub mod events;
pub mod identity;
pub mod lenient;
pub mod snapshot;
pub mod timefmt;

// Re-export commonly used types
pub use evaluation::{ErrorKind, EvaluationError, EvaluationRecord, PersistedState, StateLabel};
pub use events::{AuditEntry, AuditEvent};
pub use identity::{Canon, Identity};
pub use snapshot::{Passthrough, Provenance, ResolvedTimestamp, Snapshot};
