// One prospect's outreach session: the state machine plus its collaborators
//
// Actions are checked against the current capabilities, the collaborator
// call runs under a single-call ticket and a cancellation signal, and only
// then is the resulting event handed to the machine.

pub mod actions;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DraftingVariant;
use crate::funnel::{
    describe, Action, Capabilities, Category, FunnelEvent, OutreachStateMachine, Phase,
    ProspectContext, ProspectId, RetryPolicy, TransitionError, TransitionRecord,
};
use crate::gateway::{
    classify_or_default, draft_or_fallback, Classification, DraftIntent, DraftedMessage,
    MessageDrafter, ResponseClassifier,
};
use crate::prospect::ProspectProfile;
use crate::shutdown::ShutdownSignal;

pub use actions::{ActionOutcome, ActionRequest};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("action {action} is not available in phase {phase}")]
    ActionNotPermitted { action: Action, phase: Phase },

    #[error("a collaborator call is already in flight for prospect {prospect_id}")]
    CallInFlight { prospect_id: ProspectId },

    #[error("call ticket {ticket} is no longer current")]
    StaleTicket { ticket: u64 },

    #[error("session cancelled while {action} was running")]
    Cancelled { action: Action },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Ticket for an outstanding collaborator call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCall {
    pub ticket: u64,
    pub action: Action,
    pub phase: Phase,
}

/// Collaborator result waiting to be applied to the machine
struct CallResult {
    event: FunnelEvent,
    draft: Option<DraftedMessage>,
    classification: Option<Classification>,
    used_fallback: bool,
}

impl CallResult {
    /// Archive and Stage 1 confirmations have no collaborator output
    fn confirmation(event: FunnelEvent) -> Self {
        Self {
            event,
            draft: None,
            classification: None,
            used_fallback: false,
        }
    }
}

pub struct ProspectSession {
    machine: OutreachStateMachine,
    profile: ProspectProfile,
    drafter: Arc<dyn MessageDrafter>,
    classifier: Arc<dyn ResponseClassifier>,
    variant: DraftingVariant,
    shutdown: ShutdownSignal,
    in_flight: Option<PendingCall>,
    next_ticket: u64,
}

impl ProspectSession {
    pub fn new(
        profile: ProspectProfile,
        policy: RetryPolicy,
        drafter: Arc<dyn MessageDrafter>,
        classifier: Arc<dyn ResponseClassifier>,
        variant: DraftingVariant,
    ) -> Self {
        let machine = OutreachStateMachine::new(profile.prospect_id(), policy);
        Self {
            machine,
            profile,
            drafter,
            classifier,
            variant,
            shutdown: ShutdownSignal::never(),
            in_flight: None,
            next_ticket: 1,
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn context(&self) -> &ProspectContext {
        self.machine.context()
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn profile(&self) -> &ProspectProfile {
        &self.profile
    }

    /// Recomputed from the current phase on every call
    pub fn capabilities(&self) -> Capabilities {
        describe(self.machine.phase())
    }

    pub fn history(&self) -> &[TransitionRecord] {
        self.machine.history()
    }

    pub fn pending_call(&self) -> Option<PendingCall> {
        self.in_flight
    }

    /// Reserve the single collaborator slot for `action`
    pub fn begin_call(&mut self, action: Action) -> Result<PendingCall, SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::CallInFlight {
                prospect_id: self.context().prospect_id().clone(),
            });
        }

        let call = PendingCall {
            ticket: self.next_ticket,
            action,
            phase: self.phase(),
        };
        self.next_ticket += 1;
        self.in_flight = Some(call);
        debug!(ticket = call.ticket, action = %action, "Collaborator call started");
        Ok(call)
    }

    /// Release the slot and apply `event`. A stale ticket leaves the context alone.
    pub fn finish_call(&mut self, ticket: u64, event: FunnelEvent) -> Result<TransitionRecord, SessionError> {
        match self.in_flight {
            Some(call) if call.ticket == ticket => {
                self.in_flight = None;
                let record = self.machine.handle(event)?;
                Ok(record.clone())
            }
            _ => {
                warn!(ticket, event = %event, "Discarding result for stale call ticket");
                Err(SessionError::StaleTicket { ticket })
            }
        }
    }

    /// Release the slot without applying anything
    pub fn abandon_call(&mut self, ticket: u64) {
        if matches!(self.in_flight, Some(call) if call.ticket == ticket) {
            self.in_flight = None;
            debug!(ticket, "Collaborator call abandoned");
        }
    }

    /// Run one action end to end
    pub async fn invoke(&mut self, request: ActionRequest) -> Result<ActionOutcome, SessionError> {
        let action = request.action();
        let phase = self.phase();
        if !self.capabilities().allows(action) {
            warn!(
                prospect_id = %self.context().prospect_id(),
                action = %action,
                phase = %phase,
                "Action not permitted in current phase"
            );
            return Err(SessionError::ActionNotPermitted { action, phase });
        }

        let call = self.begin_call(action)?;
        if self.shutdown.is_triggered() {
            self.abandon_call(call.ticket);
            return Err(SessionError::Cancelled { action });
        }

        let mut shutdown = self.shutdown.clone();
        let work = self.run_collaborator(&request);
        let result = tokio::select! {
            biased;
            _ = shutdown.triggered() => None,
            result = work => Some(result),
        };

        let Some(result) = result else {
            info!(action = %action, "Session cancelled, discarding collaborator result");
            self.abandon_call(call.ticket);
            return Err(SessionError::Cancelled { action });
        };

        let transition = self.finish_call(call.ticket, result.event)?;
        let report = self.report(action, &transition, result.draft.as_ref());

        info!(
            prospect_id = %self.context().prospect_id(),
            action = %action,
            from = %transition.from,
            to = %transition.to,
            used_fallback = result.used_fallback,
            "Action completed"
        );

        Ok(ActionOutcome {
            action,
            report,
            draft: result.draft,
            classification: result.classification,
            used_fallback: result.used_fallback,
            transition,
        })
    }

    fn run_collaborator(&self, request: &ActionRequest) -> impl std::future::Future<Output = CallResult> + Send + 'static {
        let drafter = Arc::clone(&self.drafter);
        let classifier = Arc::clone(&self.classifier);
        let prospect = self.profile.describe();
        let variant = self.variant;
        let request = request.clone();
        // The follow-up counter was already bumped on entry to GenerateFollowUp.
        let attempt = self.context().follow_up_tries().max(1);

        async move {
            let intent = match request {
                ActionRequest::GenerateWarmupMessage => DraftIntent::Warmup,
                ActionRequest::GenerateContextualMessage => DraftIntent::Contextual,
                ActionRequest::GenerateFollowUpMessage => DraftIntent::FollowUp { attempt },
                ActionRequest::CollectFeedback { feedback } => {
                    let feedback = feedback.filter(|text| !text.trim().is_empty());
                    let classification = match feedback {
                        Some(text) => classify_or_default(classifier.as_ref(), &text, &prospect).await,
                        None => Classification::new(Category::NoResponse, "The prospect did not reply"),
                    };
                    return CallResult {
                        event: FunnelEvent::Classified(classification.category),
                        used_fallback: classification.fallback,
                        classification: Some(classification),
                        draft: None,
                    };
                }
                ActionRequest::ArchiveProspect => return CallResult::confirmation(FunnelEvent::ProspectArchived),
                ActionRequest::MoveToStage1 => return CallResult::confirmation(FunnelEvent::Stage1Reached),
            };

            let (draft, used_fallback) = draft_or_fallback(drafter.as_ref(), intent, &prospect, variant).await;
            CallResult {
                event: FunnelEvent::MessageGenerated,
                draft: Some(draft),
                classification: None,
                used_fallback,
            }
        }
    }

    fn report(&self, action: Action, transition: &TransitionRecord, draft: Option<&DraftedMessage>) -> String {
        let prospect_id = self.context().prospect_id();
        let summary = match action {
            Action::GenerateWarmupMessage => "Warm up message was generated successfully.".to_string(),
            Action::GenerateContextualMessage => "Contextual message was generated successfully.".to_string(),
            Action::GenerateFollowUpMessage => "Follow-up message was generated successfully.".to_string(),
            Action::CollectFeedback => match transition.to {
                Phase::AdvanceToStage1 => "Prospect showed interest in business - transitioning to Stage 1".to_string(),
                Phase::GenerateContextual => {
                    "Prospect responded positively - transitioning to generate contextual message".to_string()
                }
                Phase::GenerateFollowUp => {
                    "No response from prospect - transitioning to generate follow-up".to_string()
                }
                _ if transition.event == FunnelEvent::Classified(Category::NoResponse) => {
                    "No response from prospect and no follow-ups left - transitioning to archive".to_string()
                }
                _ => "Prospect responded negatively - transitioning to archive".to_string(),
            },
            Action::ArchiveProspect => format!(
                "Archived prospect {prospect_id}. This prospect has been marked as unresponsive and removed from active outreach."
            ),
            Action::MoveToStage1 => format!(
                "Moved prospect {prospect_id} to Stage 1. The prospect has shown interest and is ready for deeper business discussions."
            ),
        };

        match draft {
            Some(message) => format!("{summary}\n\n{message}"),
            None => summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::drafting::MockMessageDrafter;
    use crate::gateway::classifier::MockResponseClassifier;
    use crate::gateway::GatewayError;
    use crate::shutdown::ShutdownCoordinator;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Drafter that takes long enough for a shutdown to land mid-call
    struct SlowDrafter;

    #[async_trait]
    impl MessageDrafter for SlowDrafter {
        async fn draft(&self, _intent: DraftIntent, _prospect: &str) -> Result<DraftedMessage, GatewayError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(DraftedMessage::Single("Hi John!".to_string()))
        }
    }

    fn drafter_saying(text: &'static str) -> MockMessageDrafter {
        let mut drafter = MockMessageDrafter::new();
        drafter
            .expect_draft()
            .returning(move |_, _| Ok(DraftedMessage::Single(text.to_string())));
        drafter
    }

    fn classifier_returning(category: Category) -> MockResponseClassifier {
        let mut classifier = MockResponseClassifier::new();
        classifier
            .expect_classify()
            .returning(move |_, _| Ok(Classification::new(category, "test")));
        classifier
    }

    fn session(drafter: MockMessageDrafter, classifier: MockResponseClassifier) -> ProspectSession {
        ProspectSession::new(
            ProspectProfile::default(),
            RetryPolicy::default(),
            Arc::new(drafter),
            Arc::new(classifier),
            DraftingVariant::Single,
        )
    }

    fn feedback(text: &str) -> ActionRequest {
        ActionRequest::CollectFeedback {
            feedback: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_warmup_moves_to_collect_feedback() {
        let mut session = session(drafter_saying("Hi John!"), MockResponseClassifier::new());

        let outcome = session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap();

        assert_eq!(session.phase(), Phase::CollectFeedback);
        assert_eq!(outcome.draft, Some(DraftedMessage::Single("Hi John!".to_string())));
        assert!(outcome.report.starts_with("Warm up message was generated successfully."));
        assert!(!outcome.used_fallback);
    }

    #[tokio::test]
    async fn test_disallowed_action_is_rejected_without_mutation() {
        let mut session = session(MockMessageDrafter::new(), MockResponseClassifier::new());

        let err = session.invoke(ActionRequest::MoveToStage1).await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::ActionNotPermitted {
                action: Action::MoveToStage1,
                phase: Phase::GenerateWarmup
            }
        ));
        assert_eq!(session.phase(), Phase::GenerateWarmup);
        assert!(session.history().is_empty());
        assert!(session.pending_call().is_none());
    }

    #[tokio::test]
    async fn test_blank_feedback_counts_as_no_response() {
        // No expectations: the classifier must not be called.
        let mut session = session(drafter_saying("Hi"), MockResponseClassifier::new());
        session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap();

        let outcome = session.invoke(feedback("   ")).await.unwrap();

        assert_eq!(outcome.classification.unwrap().category, Category::NoResponse);
        assert_eq!(session.phase(), Phase::GenerateFollowUp);
        assert_eq!(session.context().follow_up_tries(), 1);
        assert_eq!(
            outcome.report,
            "No response from prospect - transitioning to generate follow-up"
        );
    }

    #[tokio::test]
    async fn test_asked_about_business_then_stage1() {
        let mut session = session(
            drafter_saying("Hi"),
            classifier_returning(Category::AskedAboutBusiness),
        );
        session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap();
        session.invoke(feedback("What does your company do?")).await.unwrap();
        assert_eq!(session.phase(), Phase::AdvanceToStage1);

        let outcome = session.invoke(ActionRequest::MoveToStage1).await.unwrap();
        assert_eq!(session.phase(), Phase::AdvancedToStage1);
        assert!(outcome.report.starts_with("Moved prospect PROSPECT_JOHN_DOE to Stage 1."));
        assert!(session.capabilities().allowed_actions.is_empty());
    }

    #[tokio::test]
    async fn test_classifier_failure_defaults_to_positive() {
        let mut classifier = MockResponseClassifier::new();
        classifier
            .expect_classify()
            .returning(|_, _| Err(GatewayError::Unparseable("???".to_string())));
        let mut session = session(drafter_saying("Hi"), classifier);
        session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap();

        let outcome = session.invoke(feedback("ok")).await.unwrap();

        assert!(outcome.used_fallback);
        assert_eq!(session.phase(), Phase::GenerateContextual);
    }

    #[tokio::test]
    async fn test_follow_up_draft_gets_attempt_number() {
        let mut drafter = MockMessageDrafter::new();
        drafter.expect_draft().returning(|intent, _| {
            let text = match intent {
                DraftIntent::FollowUp { attempt: 1 } => "Checking in",
                _ => "Hi",
            };
            Ok(DraftedMessage::Single(text.to_string()))
        });
        let mut session = session(drafter, MockResponseClassifier::new());

        session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap();
        session
            .invoke(ActionRequest::CollectFeedback { feedback: None })
            .await
            .unwrap();
        let outcome = session.invoke(ActionRequest::GenerateFollowUpMessage).await.unwrap();

        assert_eq!(outcome.draft, Some(DraftedMessage::Single("Checking in".to_string())));
    }

    #[test]
    fn test_second_call_is_rejected_while_one_is_in_flight() {
        let mut session = session(MockMessageDrafter::new(), MockResponseClassifier::new());

        let first = session.begin_call(Action::GenerateWarmupMessage).unwrap();
        let err = session.begin_call(Action::GenerateWarmupMessage).unwrap_err();
        assert!(matches!(err, SessionError::CallInFlight { .. }));

        session.finish_call(first.ticket, FunnelEvent::MessageGenerated).unwrap();
        assert_eq!(session.phase(), Phase::CollectFeedback);
        assert!(session.begin_call(Action::CollectFeedback).is_ok());
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut session = session(MockMessageDrafter::new(), MockResponseClassifier::new());

        let first = session.begin_call(Action::GenerateWarmupMessage).unwrap();
        session.abandon_call(first.ticket);
        let _second = session.begin_call(Action::GenerateWarmupMessage).unwrap();

        let err = session
            .finish_call(first.ticket, FunnelEvent::MessageGenerated)
            .unwrap_err();
        assert!(matches!(err, SessionError::StaleTicket { ticket } if ticket == first.ticket));
        assert_eq!(session.phase(), Phase::GenerateWarmup);
    }

    #[tokio::test]
    async fn test_cancelled_session_discards_result() {
        let coordinator = ShutdownCoordinator::new();
        let mut session = session(drafter_saying("Hi"), MockResponseClassifier::new())
            .with_shutdown(coordinator.signal());
        coordinator.trigger();

        let err = session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap_err();

        assert!(matches!(err, SessionError::Cancelled { action: Action::GenerateWarmupMessage }));
        assert_eq!(session.phase(), Phase::GenerateWarmup);
        assert!(session.pending_call().is_none());
    }

    #[tokio::test]
    async fn test_cancel_during_pending_call_leaves_context_unchanged() {
        let coordinator = ShutdownCoordinator::new();
        let session = ProspectSession::new(
            ProspectProfile::default(),
            RetryPolicy::default(),
            Arc::new(SlowDrafter),
            Arc::new(MockResponseClassifier::new()),
            DraftingVariant::Single,
        );
        let mut session = session.with_shutdown(coordinator.signal());

        let trigger = coordinator.clone();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        });

        let err = session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, SessionError::Cancelled { action: Action::GenerateWarmupMessage }));
        assert_eq!(session.phase(), Phase::GenerateWarmup);
        assert!(session.pending_call().is_none());
        assert!(session.history().is_empty());

        // The slot was released, so a fresh session signal lets the next call through.
        let mut session = session.with_shutdown(ShutdownSignal::never());
        let outcome = session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap();
        assert_eq!(outcome.draft, Some(DraftedMessage::Single("Hi John!".to_string())));
        assert_eq!(session.phase(), Phase::CollectFeedback);
    }

    #[tokio::test]
    async fn test_negative_feedback_then_archive() {
        let mut session = session(drafter_saying("Hi"), classifier_returning(Category::NegativeResponse));
        session.invoke(ActionRequest::GenerateWarmupMessage).await.unwrap();
        session.invoke(feedback("Not interested")).await.unwrap();
        assert_eq!(session.phase(), Phase::Archive);

        let outcome = session.invoke(ActionRequest::ArchiveProspect).await.unwrap();

        assert_eq!(session.phase(), Phase::Archived);
        assert!(outcome.draft.is_none());
        assert!(outcome.classification.is_none());
        assert!(outcome.report.starts_with("Archived prospect PROSPECT_JOHN_DOE."));
    }
}
