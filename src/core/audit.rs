//! Best-effort audit recorder.

use std::sync::Arc;

use tracing::debug;

use crate::domain::AuditEntry;

use super::best_effort::BestEffort;
use super::ports::AuditSink;

/// Serializes audit entries onto an [`AuditSink`].
///
/// `record` cannot fail: serialization or I/O errors come back as
/// [`BestEffort::Swallowed`] and are otherwise only visible at debug level.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub async fn record(&self, entry: &AuditEntry) -> BestEffort {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => return swallowed(e.to_string()),
        };

        match self.sink.append_line(&line).await {
            Ok(()) => BestEffort::Written,
            Err(e) => swallowed(e.to_string()),
        }
    }
}

fn swallowed(reason: String) -> BestEffort {
    debug!(%reason, "Audit write dropped");
    BestEffort::Swallowed { reason }
}
