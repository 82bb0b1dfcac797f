// Capability resolver: which actions a phase authorizes, and how to instruct the assistant

use serde::Serialize;

use crate::funnel::types::{Action, Phase};

/// Instructions and action whitelist for one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub phase: Phase,
    pub instructions: &'static str,
    pub allowed_actions: Vec<Action>,
}

impl Capabilities {
    pub fn allows(&self, action: Action) -> bool {
        self.allowed_actions.contains(&action)
    }
}

/// Resolve the capability set for `phase`.
///
/// Pure and stateless: call it again after every transition instead of
/// holding on to a previous result.
pub fn describe(phase: Phase) -> Capabilities {
    let (instructions, allowed_actions): (&'static str, &[Action]) = match phase {
        Phase::GenerateWarmup => (
            "You must use the generateWarmupMessage action to create a message for the prospect. \
             Do not provide message suggestions in your response - only use the action call.",
            &[Action::GenerateWarmupMessage],
        ),
        Phase::CollectFeedback => (
            "You must use the collectFeedback action to record and classify the prospect's response. \
             Pass the prospect's reply as the feedback argument, or omit it if they did not reply. \
             Do not provide analysis in your chat response - only use the action call.",
            &[Action::CollectFeedback],
        ),
        Phase::GenerateContextual => (
            "You must use the generateContextualMessage action to create a contextual message. \
             Do not provide message suggestions in your response - only use the action call.",
            &[Action::GenerateContextualMessage],
        ),
        Phase::GenerateFollowUp => (
            "You must use the generateFollowUpMessage action to create a follow-up message. \
             Do not provide message suggestions in your response - only use the action call.",
            &[Action::GenerateFollowUpMessage],
        ),
        Phase::Archive => (
            "You must use the archiveProspect action to archive the prospect. \
             Do not provide explanations in your response - only use the action call.",
            &[Action::ArchiveProspect],
        ),
        Phase::AdvanceToStage1 => (
            "You must use the moveToStage1 action to transition the prospect to Stage 1. \
             Do not provide explanations in your response - only use the action call.",
            &[Action::MoveToStage1],
        ),
        Phase::Archived => (
            "This prospect has been archived. No further actions are available.",
            &[],
        ),
        Phase::AdvancedToStage1 => (
            "This prospect has moved to Stage 1. No further actions are available in this stage.",
            &[],
        ),
    };

    Capabilities {
        phase,
        instructions,
        allowed_actions: allowed_actions.to_vec(),
    }
}

/// Phase whose capability set contains `action`
pub fn phase_for(action: Action) -> Phase {
    match action {
        Action::GenerateWarmupMessage => Phase::GenerateWarmup,
        Action::CollectFeedback => Phase::CollectFeedback,
        Action::GenerateContextualMessage => Phase::GenerateContextual,
        Action::GenerateFollowUpMessage => Phase::GenerateFollowUp,
        Action::ArchiveProspect => Phase::Archive,
        Action::MoveToStage1 => Phase::AdvanceToStage1,
    }
}
