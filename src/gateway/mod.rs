// Collaborator boundaries: classification and message drafting
//
// Both gateways recover from their own failures with fixed fallbacks, so the
// funnel only ever sees well-formed events.

pub mod classifier;
pub mod drafting;

use thiserror::Error;

use crate::llm::LlmError;

pub use classifier::{
    classify_or_default, parse_classification, Classification, LlmResponseClassifier,
    ResponseClassifier,
};
pub use drafting::{
    draft_or_fallback, fallback_message, ChannelBundle, DraftIntent, DraftedMessage,
    LlmMessageDrafter, MessageDrafter,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("unparseable model output: {0}")]
    Unparseable(String),

    #[error("ambiguous classification: {0}")]
    Ambiguous(String),
}
