//! State transition detection with a cooldown.
//!
//! The tracker decides two things per poll: whether a `STATE_CHANGED`
//! event is announced, and which `last_change_ts_utc` is carried into the
//! new persisted state. The observed state itself is always persisted by
//! the caller; the cooldown only gates the announcement.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{PersistedState, StateLabel};

/// Result of comparing a poll against the persisted state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionDecision {
    /// Announce a state change for this poll
    pub emit: bool,

    /// State recorded by the previous poll, if any
    pub from: Option<StateLabel>,

    /// Value to persist as the last change time
    pub last_change_at: Option<DateTime<Utc>>,
}

/// Detects state changes across polls
#[derive(Debug, Clone, Copy)]
pub struct StateTransitionTracker {
    cooldown: Duration,
}

impl StateTransitionTracker {
    pub fn new(cooldown_seconds: i64) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_seconds),
        }
    }

    /// Whether the cooldown since the last announced change has elapsed.
    ///
    /// No history, or a missing last change time, counts as elapsed.
    pub fn cooldown_elapsed(&self, previous: Option<&PersistedState>, now: DateTime<Utc>) -> bool {
        match previous.and_then(|p| p.last_change_at) {
            Some(last_change) => now - last_change >= self.cooldown,
            None => true,
        }
    }

    pub fn evaluate(
        &self,
        previous: Option<&PersistedState>,
        new_state: StateLabel,
        now: DateTime<Utc>,
    ) -> TransitionDecision {
        let from = previous.map(|p| p.state);
        let emit = from != Some(new_state) && self.cooldown_elapsed(previous, now);

        let last_change_at = if emit {
            Some(now)
        } else {
            previous.and_then(|p| p.last_change_at)
        };

        TransitionDecision {
            emit,
            from,
            last_change_at,
        }
    }
}
