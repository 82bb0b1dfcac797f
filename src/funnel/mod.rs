// Outreach funnel - phase table, guarded transitions and per-phase capabilities

pub mod capabilities;
pub mod retry_policy;
pub mod state_machine;
pub mod types;

pub use capabilities::{describe, phase_for, Capabilities};
pub use retry_policy::{InvalidBudget, RetryPolicy, DEFAULT_MAX_FOLLOW_UP_ATTEMPTS};
pub use state_machine::{
    transition, OutreachStateMachine, SideEffect, Step, TransitionError, TransitionRecord,
};
pub use types::{
    Action, Category, FunnelEvent, ParseActionError, ParseCategoryError, ParsePhaseError, Phase,
    ProspectContext, ProspectId,
};
