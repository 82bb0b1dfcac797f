use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::funnel::retry_policy::RetryPolicy;
use crate::funnel::types::{Category, FunnelEvent, Phase, ProspectContext, ProspectId};

/// Rejections from the transition function. The context is never mutated
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("event {event} is not accepted in phase {phase}")]
    NotAccepted { phase: Phase, event: FunnelEvent },

    #[error("phase {phase} is terminal; event {event} rejected")]
    Terminal { phase: Phase, event: FunnelEvent },
}

impl TransitionError {
    pub fn phase(&self) -> Phase {
        match self {
            TransitionError::NotAccepted { phase, .. } | TransitionError::Terminal { phase, .. } => *phase,
        }
    }
}

/// Counter adjustments that accompany a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideEffect {
    /// Entry action of `GenerateFollowUp`
    IncrementFollowUpTries,
    /// Positive engagement restores the full follow-up budget
    ResetFollowUpTries,
}

/// Result of the pure transition function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub from: Phase,
    pub to: Phase,
    pub effects: Vec<SideEffect>,
}

impl Step {
    fn new(from: Phase, to: Phase) -> Self {
        let mut effects = Vec::new();
        if to == Phase::GenerateFollowUp {
            effects.push(SideEffect::IncrementFollowUpTries);
        }
        Self { from, to, effects }
    }

    fn with_reset(mut self) -> Self {
        self.effects.insert(0, SideEffect::ResetFollowUpTries);
        self
    }
}

/// Compute the next phase for `event` without touching the context.
///
/// Reads nothing beyond the phase and the follow-up counter. The retry
/// guard is evaluated here, exactly once, for `NoResponse` in
/// `CollectFeedback`.
pub fn transition(
    context: &ProspectContext,
    policy: &RetryPolicy,
    event: FunnelEvent,
) -> Result<Step, TransitionError> {
    let phase = context.phase();

    let step = match (phase, event) {
        (Phase::GenerateWarmup, FunnelEvent::MessageGenerated)
        | (Phase::GenerateContextual, FunnelEvent::MessageGenerated)
        | (Phase::GenerateFollowUp, FunnelEvent::MessageGenerated) => {
            Step::new(phase, Phase::CollectFeedback)
        }

        (Phase::CollectFeedback, FunnelEvent::Classified(category)) => match category {
            Category::AskedAboutBusiness => Step::new(phase, Phase::AdvanceToStage1).with_reset(),
            Category::PositiveOrNeutral => Step::new(phase, Phase::GenerateContextual).with_reset(),
            Category::NoResponse => {
                if policy.has_budget(context) {
                    Step::new(phase, Phase::GenerateFollowUp)
                } else {
                    Step::new(phase, Phase::Archive)
                }
            }
            Category::NegativeResponse => Step::new(phase, Phase::Archive),
        },

        (Phase::Archive, FunnelEvent::ProspectArchived) => Step::new(phase, Phase::Archived),
        (Phase::AdvanceToStage1, FunnelEvent::Stage1Reached) => {
            Step::new(phase, Phase::AdvancedToStage1)
        }

        (phase, event) if phase.is_terminal() => {
            return Err(TransitionError::Terminal { phase, event });
        }
        (phase, event) => return Err(TransitionError::NotAccepted { phase, event }),
    };

    Ok(step)
}

/// Audit trail entry for an applied transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Phase,
    pub to: Phase,
    pub event: FunnelEvent,
    pub effects: Vec<SideEffect>,
    pub follow_up_tries: u32,
    pub timestamp: DateTime<Utc>,
}

/// Owns one prospect's context and applies transitions to it
#[derive(Debug, Clone)]
pub struct OutreachStateMachine {
    context: ProspectContext,
    policy: RetryPolicy,
    history: Vec<TransitionRecord>,
}

impl OutreachStateMachine {
    pub fn new(prospect_id: ProspectId, policy: RetryPolicy) -> Self {
        Self {
            context: ProspectContext::new(prospect_id),
            policy,
            history: Vec::new(),
        }
    }

    pub fn context(&self) -> &ProspectContext {
        &self.context
    }

    pub fn phase(&self) -> Phase {
        self.context.phase()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// Apply `event`. On rejection the context is left exactly as it was.
    pub fn handle(&mut self, event: FunnelEvent) -> Result<&TransitionRecord, TransitionError> {
        let step = match transition(&self.context, &self.policy, event) {
            Ok(step) => step,
            Err(e) => {
                warn!(
                    prospect_id = %self.context.prospect_id(),
                    phase = %self.context.phase(),
                    event = %event,
                    "Rejected funnel event: {}",
                    e
                );
                return Err(e);
            }
        };

        for effect in &step.effects {
            match effect {
                SideEffect::IncrementFollowUpTries => self.context.increment_follow_up_tries(),
                SideEffect::ResetFollowUpTries => self.context.reset_follow_up_tries(),
            }
        }
        self.context.set_phase(step.to);

        debug_assert!(
            matches!(self.context.phase(), Phase::Archive | Phase::Archived)
                || self.context.follow_up_tries() <= self.policy.max_follow_up_attempts(),
            "follow-up counter exceeded its budget outside archive"
        );

        Ok(self.record_transition(step, event))
    }

    fn record_transition(&mut self, step: Step, event: FunnelEvent) -> &TransitionRecord {
        let record = TransitionRecord {
            from: step.from,
            to: step.to,
            event,
            effects: step.effects,
            follow_up_tries: self.context.follow_up_tries(),
            timestamp: Utc::now(),
        };

        info!(
            prospect_id = %self.context.prospect_id(),
            from = %record.from,
            to = %record.to,
            event = %record.event,
            follow_up_tries = record.follow_up_tries,
            "Funnel state transition"
        );
        if record.to == Phase::Archive && event == FunnelEvent::Classified(Category::NoResponse) {
            debug!(
                prospect_id = %self.context.prospect_id(),
                max_follow_up_attempts = self.policy.max_follow_up_attempts(),
                "Follow-up budget exhausted"
            );
        }

        self.history.push(record);
        &self.history[self.history.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(max: u32) -> OutreachStateMachine {
        OutreachStateMachine::new(
            ProspectId::new("PROSPECT_JOHN_DOE"),
            RetryPolicy::new(max).unwrap(),
        )
    }

    fn drive(sm: &mut OutreachStateMachine, events: &[FunnelEvent]) {
        for event in events {
            sm.handle(*event).unwrap();
        }
    }

    use crate::funnel::types::FunnelEvent::MessageGenerated;
    const POSITIVE: FunnelEvent = FunnelEvent::Classified(Category::PositiveOrNeutral);
    const SILENCE: FunnelEvent = FunnelEvent::Classified(Category::NoResponse);
    const ASKED: FunnelEvent = FunnelEvent::Classified(Category::AskedAboutBusiness);
    const NEGATIVE: FunnelEvent = FunnelEvent::Classified(Category::NegativeResponse);

    #[test]
    fn test_positive_then_silence_lands_in_follow_up() {
        let mut sm = machine(1);
        drive(&mut sm, &[MessageGenerated, POSITIVE, MessageGenerated, SILENCE]);

        assert_eq!(sm.phase(), Phase::GenerateFollowUp);
        assert_eq!(sm.context().follow_up_tries(), 1);
    }

    #[test]
    fn test_budget_exhaustion_routes_to_archive() {
        let mut sm = machine(1);
        drive(&mut sm, &[MessageGenerated, SILENCE, MessageGenerated]);
        assert_eq!(sm.phase(), Phase::CollectFeedback);

        sm.handle(SILENCE).unwrap();
        assert_eq!(sm.phase(), Phase::Archive);
        assert_eq!(sm.context().follow_up_tries(), 1);
    }

    #[test]
    fn test_contextual_resets_follow_up_budget() {
        let mut sm = machine(1);
        drive(&mut sm, &[MessageGenerated, SILENCE, MessageGenerated]);
        assert_eq!(sm.context().follow_up_tries(), 1);

        sm.handle(POSITIVE).unwrap();
        assert_eq!(sm.phase(), Phase::GenerateContextual);
        assert_eq!(sm.context().follow_up_tries(), 0);

        drive(&mut sm, &[MessageGenerated, SILENCE]);
        assert_eq!(sm.phase(), Phase::GenerateFollowUp);
        assert_eq!(sm.context().follow_up_tries(), 1);
    }

    #[test]
    fn test_asked_about_business_ignores_counter() {
        let mut sm = machine(2);
        drive(&mut sm, &[MessageGenerated, SILENCE, MessageGenerated, SILENCE, MessageGenerated]);
        assert_eq!(sm.context().follow_up_tries(), 2);

        sm.handle(ASKED).unwrap();
        assert_eq!(sm.phase(), Phase::AdvanceToStage1);
        assert_eq!(sm.context().follow_up_tries(), 0);

        sm.handle(FunnelEvent::Stage1Reached).unwrap();
        assert_eq!(sm.phase(), Phase::AdvancedToStage1);
    }

    #[test]
    fn test_negative_response_archives() {
        let mut sm = machine(1);
        drive(&mut sm, &[MessageGenerated, NEGATIVE, FunnelEvent::ProspectArchived]);
        assert_eq!(sm.phase(), Phase::Archived);
        assert!(sm.context().is_finished());
    }

    #[test]
    fn test_invalid_event_leaves_context_untouched() {
        let mut sm = machine(1);
        drive(&mut sm, &[MessageGenerated, SILENCE, MessageGenerated]);
        let before = sm.context().clone();
        let history_len = sm.history().len();

        let err = sm.handle(MessageGenerated).unwrap_err();
        assert_eq!(
            err,
            TransitionError::NotAccepted {
                phase: Phase::CollectFeedback,
                event: MessageGenerated
            }
        );
        assert_eq!(sm.context(), &before);
        assert_eq!(sm.history().len(), history_len);
    }

    #[test]
    fn test_terminal_phase_rejects_everything() {
        let mut sm = machine(1);
        drive(&mut sm, &[MessageGenerated, NEGATIVE, FunnelEvent::ProspectArchived]);

        for event in [MessageGenerated, POSITIVE, FunnelEvent::ProspectArchived, FunnelEvent::Stage1Reached] {
            let err = sm.handle(event).unwrap_err();
            assert!(matches!(err, TransitionError::Terminal { phase: Phase::Archived, .. }));
        }
        assert_eq!(sm.phase(), Phase::Archived);
    }

    #[test]
    fn test_transition_function_is_pure() {
        let ctx = ProspectContext::at("p", Phase::CollectFeedback, 0);
        let policy = RetryPolicy::default();

        let first = transition(&ctx, &policy, SILENCE).unwrap();
        let second = transition(&ctx, &policy, SILENCE).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.effects, vec![SideEffect::IncrementFollowUpTries]);
        assert_eq!(ctx.follow_up_tries(), 0);
    }

    #[test]
    fn test_history_records_each_transition() {
        let mut sm = machine(1);
        drive(&mut sm, &[MessageGenerated, POSITIVE]);

        let history = sm.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, Phase::GenerateWarmup);
        assert_eq!(history[1].to, Phase::GenerateContextual);
        assert_eq!(history[1].effects, vec![SideEffect::ResetFollowUpTries]);
    }
}
