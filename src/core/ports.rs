//! Storage seams between the evaluation logic and the outside world.
//!
//! The reporter never touches the filesystem directly. File-backed
//! implementations live in [`super::file_store`], in-memory ones in
//! [`super::memory`].

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{EvaluationError, PersistedState, Snapshot};

/// Read-only access to the snapshot document
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human-readable location, reported as `file`
    fn location(&self) -> String;

    /// Whether the snapshot currently exists
    async fn exists(&self) -> bool;

    /// Load and parse the snapshot
    async fn load(&self) -> Result<Snapshot, EvaluationError>;

    /// Last modification time, if the source can report one
    async fn modified_at(&self) -> Option<DateTime<Utc>>;
}

/// Append-only line sink for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one line (without trailing newline)
    async fn append_line(&self, line: &str) -> io::Result<()>;

    /// Number of lines written so far (0 if nothing has been written)
    async fn line_count(&self) -> io::Result<usize>;

    /// Make sure the sink can be written to
    async fn ensure_writable(&self) -> io::Result<()>;
}

/// Single slot holding the state of the previous poll
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the stored state. `None` if absent or unreadable.
    async fn load(&self) -> Option<PersistedState>;

    /// Overwrite the stored state
    async fn save(&self, state: &PersistedState) -> io::Result<()>;

    /// Make sure the slot can be written to
    async fn ensure_writable(&self) -> io::Result<()>;
}

/// The three storage collaborators of a deployment
#[derive(Clone)]
pub struct Storage {
    pub source: Arc<dyn SnapshotSource>,
    pub audit: Arc<dyn AuditSink>,
    pub state: Arc<dyn StateStore>,
}

impl Storage {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        audit: Arc<dyn AuditSink>,
        state: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            source,
            audit,
            state,
        }
    }
}
