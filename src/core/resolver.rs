//! Timestamp resolution for snapshots.
//!
//! Priority, first success wins:
//! 1. `snapshot_time_utc` (ISO-8601 with explicit offset)
//! 2. `generated_at_local` (`YYYY-MM-DD HH:MM:SS` in the configured offset)
//! 3. modification time of the snapshot source
//!
//! A source that fails to parse is skipped, never reported as an error.
//! When all three fail the result is unresolved and the caller decides.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::domain::timefmt::parse_iso_offset;
use crate::domain::{Provenance, ResolvedTimestamp, Snapshot};

use super::ports::SnapshotSource;

/// Layout of `generated_at_local`
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default offset of `generated_at_local` (UTC+7)
pub const DEFAULT_LOCAL_OFFSET_SECONDS: i32 = 7 * 3600;

/// Picks the best available timestamp for a snapshot
#[derive(Debug, Clone, Copy)]
pub struct TimestampResolver {
    local_offset: FixedOffset,
}

impl Default for TimestampResolver {
    fn default() -> Self {
        Self::new(default_local_offset())
    }
}

impl TimestampResolver {
    pub fn new(local_offset: FixedOffset) -> Self {
        Self { local_offset }
    }

    /// Resolve using the document fields, then the source's mtime
    pub async fn resolve(
        &self,
        snapshot: &Snapshot,
        source: &dyn SnapshotSource,
    ) -> ResolvedTimestamp {
        if let Some(resolved) = self.resolve_fields(snapshot) {
            return resolved;
        }

        match source.modified_at().await {
            Some(mtime) => ResolvedTimestamp::found(mtime, Provenance::FileModifiedTime),
            None => {
                debug!(file = %source.location(), "No usable snapshot timestamp");
                ResolvedTimestamp::unresolved()
            }
        }
    }

    /// The document-only part of the priority chain
    pub fn resolve_fields(&self, snapshot: &Snapshot) -> Option<ResolvedTimestamp> {
        if let Some(dt) = snapshot.snapshot_time_utc().and_then(parse_iso_offset) {
            return Some(ResolvedTimestamp::found(dt, Provenance::SnapshotField));
        }

        if let Some(dt) = snapshot
            .generated_at_local()
            .and_then(|value| parse_local_time(value, self.local_offset))
        {
            return Some(ResolvedTimestamp::found(dt, Provenance::LocalField));
        }

        None
    }
}

/// The default UTC+7 offset
pub fn default_local_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_LOCAL_OFFSET_SECONDS).expect("UTC+7 is a valid offset")
}

/// Parse a `YYYY-MM-DD HH:MM:SS` wall-clock time in `offset`.
///
/// The value must be exactly 19 characters: zero-padded fields, no
/// fraction, no offset.
pub fn parse_local_time(value: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if value.len() != 19 {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(value, LOCAL_TIME_FORMAT).ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
