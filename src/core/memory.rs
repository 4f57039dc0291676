//! In-memory storage for tests and dry runs.

use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{EvaluationError, PersistedState, Snapshot};

use super::ports::{AuditSink, SnapshotSource, StateStore};

/// Snapshot held in memory. `None` behaves like a missing file.
#[derive(Debug, Default)]
pub struct MemorySnapshotSource {
    text: Mutex<Option<String>>,
    modified_at: Mutex<Option<DateTime<Utc>>>,
}

impl MemorySnapshotSource {
    pub fn new(text: Option<&str>, modified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            text: Mutex::new(text.map(str::to_string)),
            modified_at: Mutex::new(modified_at),
        }
    }

    /// Replace the snapshot text
    pub fn set_text(&self, text: Option<&str>) {
        *lock(&self.text) = text.map(str::to_string);
    }
}

#[async_trait]
impl SnapshotSource for MemorySnapshotSource {
    fn location(&self) -> String {
        "memory://snapshot".to_string()
    }

    async fn exists(&self) -> bool {
        lock(&self.text).is_some()
    }

    async fn load(&self) -> Result<Snapshot, EvaluationError> {
        let text = lock(&self.text).clone();
        match text {
            Some(text) => Snapshot::from_json(&text),
            None => Err(EvaluationError::SourceNotFound(self.location())),
        }
    }

    async fn modified_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.modified_at)
    }
}

/// Audit lines kept in a vector. `fail` makes every write error out,
/// `unreadable` makes counting error out.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    lines: Mutex<Vec<String>>,
    fail: bool,
    unreadable: bool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose writes always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// A sink that accepts writes but cannot be read back
    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Self::default()
        }
    }

    /// Everything appended so far, parsed as JSON
    pub fn entries(&self) -> Vec<serde_json::Value> {
        lock(&self.lines)
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append_line(&self, line: &str) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "audit sink is read-only"));
        }
        lock(&self.lines).push(line.to_string());
        Ok(())
    }

    async fn line_count(&self) -> io::Result<usize> {
        if self.unreadable {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "audit log is not readable"));
        }
        Ok(lock(&self.lines).len())
    }

    async fn ensure_writable(&self) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "audit sink is read-only"));
        }
        Ok(())
    }
}

/// State slot kept in memory, counting writes
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<PersistedState>>,
    saves: Mutex<usize>,
    fail: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing persisted state
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// A store whose writes always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<PersistedState> {
        lock(&self.state).clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        *lock(&self.saves)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Option<PersistedState> {
        self.current()
    }

    async fn save(&self, state: &PersistedState) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        *lock(&self.state) = Some(state.clone());
        *lock(&self.saves) += 1;
        Ok(())
    }

    async fn ensure_writable(&self) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        Ok(())
    }
}

/// Lock ignoring poisoning; the guarded values stay consistent on panic
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
