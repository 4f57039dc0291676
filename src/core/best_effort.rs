//! Outcome of writes that must never fail the caller.
//!
//! Audit and state writes sit on the observability path: an error there is
//! converted into [`BestEffort::Swallowed`] and the poll carries on.

use std::fmt::Display;

/// Result of a best-effort write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    /// The write reached its destination
    Written,

    /// The write failed and was dropped
    Swallowed { reason: String },
}

impl BestEffort {
    /// Collapse any result into a best-effort outcome
    pub fn from_result<T, E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Written,
            Err(e) => Self::Swallowed {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        assert_eq!(BestEffort::from_result::<_, String>(Ok(())), BestEffort::Written);

        let outcome = BestEffort::from_result::<(), _>(Err("permission denied"));
        assert_eq!(
            outcome,
            BestEffort::Swallowed {
                reason: "permission denied".to_string()
            }
        );
        assert!(!outcome.is_written());
    }
}
