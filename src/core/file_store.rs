//! File-backed storage: the snapshot file, the JSONL audit log and the JSON
//! state file.
//!
//! The audit log is newline-delimited JSON opened in append mode for every
//! write. The state file is overwritten wholesale. Neither file is locked;
//! concurrent writers from several processes are not coordinated.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain::{EvaluationError, PersistedState, Snapshot};

use super::ports::{AuditSink, SnapshotSource, StateStore, Storage};

/// File-backed storage for a deployment
pub fn file_storage(snapshot: &Path, audit_file: &Path, state_file: &Path) -> Storage {
    Storage::new(
        Arc::new(FileSnapshotSource::new(snapshot)),
        Arc::new(JsonlAuditSink::new(audit_file)),
        Arc::new(JsonStateStore::new(state_file)),
    )
}

/// The snapshot JSON file written by the capture job
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    async fn load(&self) -> Result<Snapshot, EvaluationError> {
        if !self.exists().await {
            return Err(EvaluationError::SourceNotFound(self.location()));
        }

        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| EvaluationError::SourceUnreadable(format!("{:?}: {}", e.kind(), e)))?;

        Snapshot::from_json(&text)
    }

    async fn modified_at(&self) -> Option<DateTime<Utc>> {
        let metadata = fs::metadata(&self.path).await.ok()?;
        let modified = metadata.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }
}

/// Append-only JSONL audit log
#[derive(Debug, Clone)]
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append_line(&self, line: &str) -> io::Result<()> {
        self.ensure_writable().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    async fn line_count(&self) -> io::Result<usize> {
        if fs::metadata(&self.path).await.is_err() {
            return Ok(0);
        }

        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut count = 0;

        while lines.next_line().await?.is_some() {
            count += 1;
        }

        Ok(count)
    }

    async fn ensure_writable(&self) -> io::Result<()> {
        ensure_parent_dir(&self.path).await
    }
}

/// Pretty-printed JSON state file, overwritten on every successful poll
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load(&self) -> Option<PersistedState> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    async fn save(&self, state: &PersistedState) -> io::Result<()> {
        self.ensure_writable().await?;

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content).await
    }

    async fn ensure_writable(&self) -> io::Result<()> {
        ensure_parent_dir(&self.path).await
    }
}

async fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}
