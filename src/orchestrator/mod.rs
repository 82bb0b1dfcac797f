// Conversational driver: turns salesperson input into model calls and session actions

pub mod action_call;
pub mod prompt;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::funnel::Action;
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::session::{ActionOutcome, ActionRequest, ProspectSession, SessionError};
use crate::usage::{CallPurpose, UsageLedger};

pub use action_call::{parse_llm_output, ActionCall, AssistantOutput};
pub use prompt::{action_protocol, state_instructions, STEVE_PERSONA};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("language model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("unknown action '{name}'. Available actions: {available}")]
    UnknownAction { name: String, available: String },
}

/// What the assistant said for one salesperson turn
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub text: String,
    /// Present when an action ran
    pub outcome: Option<ActionOutcome>,
    /// Present when the model asked for an unknown or unavailable action
    pub rejection: Option<String>,
}

pub struct ChatOrchestrator {
    llm: Arc<dyn LlmClient>,
    session: ProspectSession,
    ledger: Arc<UsageLedger>,
    transcript: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

impl ChatOrchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, session: ProspectSession, ledger: Arc<UsageLedger>) -> Self {
        Self {
            llm,
            session,
            ledger,
            transcript: Vec::new(),
            temperature: 0.2,
            max_tokens: 400,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn session(&self) -> &ProspectSession {
        &self.session
    }

    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Handle one line from the salesperson
    pub async fn handle_turn(&mut self, input: &str) -> Result<TurnReply, OrchestratorError> {
        self.transcript.push(Message::user(input));

        let output = self.complete(CallPurpose::MainChat, true).await?;
        let (preamble, call) = match parse_llm_output(&output) {
            AssistantOutput::Reply(text) => {
                self.transcript.push(Message::assistant(text.clone()));
                return Ok(TurnReply {
                    text,
                    outcome: None,
                    rejection: None,
                });
            }
            AssistantOutput::Call { preamble, call } => (preamble, call),
        };
        self.transcript.push(Message::assistant(output));

        let (outcome, rejection) = match self.dispatch(&call).await {
            Ok(outcome) => {
                self.transcript.push(Message::system(format!(
                    "Result of {}: {}",
                    outcome.action, outcome.report
                )));
                (Some(outcome), None)
            }
            Err(OrchestratorError::Session(SessionError::Cancelled { action })) => {
                return Err(SessionError::Cancelled { action }.into());
            }
            Err(e) => {
                let reason = e.to_string();
                self.transcript.push(Message::system(format!(
                    "Action {} was rejected: {}",
                    call.action, reason
                )));
                (None, Some(reason))
            }
        };

        // The action already ran; a failed narration must not lose its outcome.
        let narration = match self.complete(CallPurpose::ActionNarration, false).await {
            Ok(narration) => match parse_llm_output(&narration) {
                AssistantOutput::Reply(text) => text,
                AssistantOutput::Call { preamble, call } => {
                    debug!(action = %call.action, "Ignoring action call in narration");
                    preamble
                }
            },
            Err(e) => {
                warn!(error = %e, "Narration failed, replying with the action result");
                match (&outcome, &rejection) {
                    (Some(outcome), _) => outcome.report.clone(),
                    (None, Some(reason)) => format!("Action {} was rejected: {}", call.action, reason),
                    (None, None) => String::new(),
                }
            }
        };
        self.transcript.push(Message::assistant(narration.clone()));

        let text = if preamble.is_empty() {
            narration
        } else {
            format!("{preamble}\n\n{narration}")
        };
        Ok(TurnReply {
            text,
            outcome,
            rejection,
        })
    }

    async fn dispatch(&mut self, call: &ActionCall) -> Result<ActionOutcome, OrchestratorError> {
        let capabilities = self.session.capabilities();
        let available: Vec<&str> = capabilities.allowed_actions.iter().map(|a| a.name()).collect();

        let action = match call.action.parse::<Action>() {
            Ok(action) => action,
            Err(_) => {
                warn!(action = %call.action, "Model requested an unknown action");
                return Err(OrchestratorError::UnknownAction {
                    name: call.action.clone(),
                    available: available.join(", "),
                });
            }
        };
        if !capabilities.allows(action) {
            warn!(action = %action, phase = %capabilities.phase, "Model requested an unavailable action");
            return Err(SessionError::ActionNotPermitted {
                action,
                phase: capabilities.phase,
            }
            .into());
        }

        info!(action = %action, phase = %capabilities.phase, "Dispatching action");
        let request = ActionRequest::from_call(action, &call.args);
        Ok(self.session.invoke(request).await?)
    }

    async fn complete(&self, purpose: CallPurpose, offer_actions: bool) -> Result<String, OrchestratorError> {
        let capabilities = self.session.capabilities();
        let mut briefing = state_instructions(self.session.profile(), self.session.context(), &capabilities);
        if offer_actions {
            briefing.push_str("\n\n");
            briefing.push_str(&action_protocol(&capabilities.allowed_actions));
        } else {
            briefing.push_str("\n\nSummarize the latest action result for the salesperson. Do not call any action.");
        }

        let mut messages = vec![Message::system(STEVE_PERSONA), Message::system(briefing)];
        messages.extend(self.transcript.iter().cloned());
        let request = CompletionRequest::new(messages, self.temperature).with_max_tokens(self.max_tokens);

        let completion = self.llm.complete(&request).await?;
        if let Some(usage) = completion.usage {
            self.ledger.record(self.llm.model(), purpose, usage);
        }
        Ok(completion.content)
    }
}
