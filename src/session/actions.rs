// Action requests and their outcomes

use serde::Serialize;
use serde_json::Value;

use crate::funnel::{Action, TransitionRecord};
use crate::gateway::{Classification, DraftedMessage};

/// An action together with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    GenerateWarmupMessage,
    GenerateContextualMessage,
    GenerateFollowUpMessage,
    /// `None` (or blank) means the prospect did not reply
    CollectFeedback { feedback: Option<String> },
    ArchiveProspect,
    MoveToStage1,
}

impl ActionRequest {
    pub fn action(&self) -> Action {
        match self {
            ActionRequest::GenerateWarmupMessage => Action::GenerateWarmupMessage,
            ActionRequest::GenerateContextualMessage => Action::GenerateContextualMessage,
            ActionRequest::GenerateFollowUpMessage => Action::GenerateFollowUpMessage,
            ActionRequest::CollectFeedback { .. } => Action::CollectFeedback,
            ActionRequest::ArchiveProspect => Action::ArchiveProspect,
            ActionRequest::MoveToStage1 => Action::MoveToStage1,
        }
    }

    /// Build a request from a parsed action call. Only `collectFeedback`
    /// takes an argument; extra arguments are ignored.
    pub fn from_call(action: Action, args: &Value) -> Self {
        match action {
            Action::GenerateWarmupMessage => ActionRequest::GenerateWarmupMessage,
            Action::GenerateContextualMessage => ActionRequest::GenerateContextualMessage,
            Action::GenerateFollowUpMessage => ActionRequest::GenerateFollowUpMessage,
            Action::CollectFeedback => ActionRequest::CollectFeedback {
                feedback: args
                    .get("feedback")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            Action::ArchiveProspect => ActionRequest::ArchiveProspect,
            Action::MoveToStage1 => ActionRequest::MoveToStage1,
        }
    }
}

/// What an action did, for the orchestrator and the user
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: Action,
    /// Result text fed back to the assistant
    pub report: String,
    pub draft: Option<DraftedMessage>,
    pub classification: Option<Classification>,
    /// A gateway failed and a fixed fallback was used
    pub used_fallback: bool,
    pub transition: TransitionRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feedback_argument_extracted() {
        let request = ActionRequest::from_call(
            Action::CollectFeedback,
            &json!({"feedback": "What does your company do?"}),
        );
        assert_eq!(
            request,
            ActionRequest::CollectFeedback {
                feedback: Some("What does your company do?".to_string())
            }
        );
    }

    #[test]
    fn test_missing_feedback_is_none() {
        let request = ActionRequest::from_call(Action::CollectFeedback, &json!({}));
        assert_eq!(request, ActionRequest::CollectFeedback { feedback: None });
        assert_eq!(request.action(), Action::CollectFeedback);
    }

    #[test]
    fn test_arguments_ignored_for_other_actions() {
        let request = ActionRequest::from_call(Action::ArchiveProspect, &json!({"reason": "rude"}));
        assert_eq!(request, ActionRequest::ArchiveProspect);
    }
}
