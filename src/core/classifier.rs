//! Freshness classification.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::StateLabel;

/// Freshness thresholds, all in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Cadence of the capture job. Reported, not used for the decision.
    pub expected_interval_seconds: i64,

    /// Maximum age still considered fresh
    pub staleness_limit_seconds: i64,

    /// Minimum time between two emitted state change events
    pub state_change_cooldown_seconds: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            expected_interval_seconds: 3600,
            staleness_limit_seconds: 7200,
            state_change_cooldown_seconds: 600,
        }
    }
}

/// Classifies a resolved snapshot instant as `OK` or `STALE`
#[derive(Debug, Clone, Copy)]
pub struct StalenessClassifier {
    staleness_limit_seconds: i64,
}

impl StalenessClassifier {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            staleness_limit_seconds: thresholds.staleness_limit_seconds,
        }
    }

    /// Returns the state and the age in whole seconds.
    ///
    /// A snapshot dated in the future yields a negative age, which counts
    /// as fresh.
    pub fn classify(&self, instant: DateTime<Utc>, now: DateTime<Utc>) -> (StateLabel, i64) {
        let age_seconds = floor_seconds(now - instant);
        let state = if age_seconds <= self.staleness_limit_seconds {
            StateLabel::Ok
        } else {
            StateLabel::Stale
        };
        (state, age_seconds)
    }
}

/// Whole seconds, rounded towards negative infinity
fn floor_seconds(elapsed: Duration) -> i64 {
    let secs = elapsed.num_seconds();
    if elapsed < Duration::seconds(secs) {
        secs - 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn classifier() -> StalenessClassifier {
        StalenessClassifier::new(&Thresholds::default())
    }

    #[test]
    fn test_fresh_snapshot() {
        let (state, age) = classifier().classify(now() - Duration::seconds(100), now());
        assert_eq!(state, StateLabel::Ok);
        assert_eq!(age, 100);
    }

    #[test]
    fn test_stale_snapshot() {
        let (state, age) = classifier().classify(now() - Duration::seconds(10_000), now());
        assert_eq!(state, StateLabel::Stale);
        assert_eq!(age, 10_000);
    }

    #[test]
    fn test_limit_is_inclusive() {
        assert_eq!(
            classifier().classify(now() - Duration::seconds(7200), now()).0,
            StateLabel::Ok
        );
        assert_eq!(
            classifier().classify(now() - Duration::seconds(7201), now()).0,
            StateLabel::Stale
        );
    }

    #[test]
    fn test_future_timestamp_gives_negative_age() {
        let (state, age) = classifier().classify(now() + Duration::seconds(30), now());
        assert_eq!(state, StateLabel::Ok);
        assert_eq!(age, -30);
    }

    #[test]
    fn test_age_is_floored() {
        let (_, age) = classifier().classify(now() - Duration::milliseconds(1500), now());
        assert_eq!(age, 1);

        let (_, age) = classifier().classify(now() + Duration::milliseconds(1500), now());
        assert_eq!(age, -2);
    }

    #[test]
    fn test_classification_is_monotonic_in_age() {
        let classifier = classifier();
        let mut seen_stale = false;

        for age in (-60..20_000).step_by(37) {
            let (state, _) = classifier.classify(now() - Duration::seconds(age), now());
            if seen_stale {
                assert_eq!(state, StateLabel::Stale, "age {} turned fresh again", age);
            }
            seen_stale |= state == StateLabel::Stale;
        }
        assert!(seen_stale);
    }
}
