// Follow-up budget for unresponsive prospects

use crate::funnel::types::ProspectContext;
use thiserror::Error;

/// Follow-up attempts allowed before a silent prospect is archived
pub const DEFAULT_MAX_FOLLOW_UP_ATTEMPTS: u32 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("max_follow_up_attempts must be a positive integer, got {0}")]
pub struct InvalidBudget(pub u32);

/// Guard deciding whether another follow-up may be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_follow_up_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_follow_up_attempts: DEFAULT_MAX_FOLLOW_UP_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_follow_up_attempts: u32) -> Result<Self, InvalidBudget> {
        if max_follow_up_attempts == 0 {
            return Err(InvalidBudget(max_follow_up_attempts));
        }
        Ok(Self {
            max_follow_up_attempts,
        })
    }

    pub fn max_follow_up_attempts(&self) -> u32 {
        self.max_follow_up_attempts
    }

    /// True while the prospect may receive another follow-up.
    ///
    /// Only the transition function calls this, once per `NoResponse`
    /// processed in `CollectFeedback`.
    pub fn has_budget(&self, context: &ProspectContext) -> bool {
        context.follow_up_tries() < self.max_follow_up_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::types::Phase;

    #[test]
    fn test_zero_budget_rejected() {
        assert_eq!(RetryPolicy::new(0), Err(InvalidBudget(0)));
    }

    #[test]
    fn test_default_allows_exactly_one_follow_up() {
        let policy = RetryPolicy::default();
        assert!(policy.has_budget(&ProspectContext::at("p", Phase::CollectFeedback, 0)));
        assert!(!policy.has_budget(&ProspectContext::at("p", Phase::CollectFeedback, 1)));
    }

    #[test]
    fn test_budget_boundary() {
        let policy = RetryPolicy::new(3).unwrap();
        assert!(policy.has_budget(&ProspectContext::at("p", Phase::CollectFeedback, 2)));
        assert!(!policy.has_budget(&ProspectContext::at("p", Phase::CollectFeedback, 3)));
    }
}
