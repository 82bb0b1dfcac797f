// Cold Outreach Library - funnel state machine, collaborators and assistant
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod funnel;
pub mod gateway;
pub mod llm;
pub mod orchestrator;
pub mod prospect;
pub mod session;
pub mod shutdown;
pub mod telemetry;
pub mod usage;

// Re-export key types for easy access
pub use config::{ConfigError, DraftingVariant, OutreachConfig};
pub use funnel::{
    describe, transition, Action, Capabilities, Category, FunnelEvent, OutreachStateMachine, Phase,
    ProspectContext, ProspectId, RetryPolicy, TransitionError, TransitionRecord,
};
pub use gateway::{Classification, DraftIntent, DraftedMessage, GatewayError, MessageDrafter, ResponseClassifier};
pub use llm::{LlmClient, LlmError, OpenAiClient, ScriptedLlmClient};
pub use orchestrator::{ChatOrchestrator, OrchestratorError, TurnReply};
pub use prospect::ProspectProfile;
pub use session::{ActionOutcome, ActionRequest, ProspectSession, SessionError};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use telemetry::{create_session_span, generate_correlation_id, init_telemetry};
pub use usage::{CallPurpose, TokenUsage, UsageLedger, UsageSummary};
