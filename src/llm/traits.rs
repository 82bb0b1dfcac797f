// Language model client abstraction shared by the orchestrator and the gateways

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::usage::TokenUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, temperature: f32) -> Self {
        Self {
            messages,
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request could not be built: {0}")]
    InvalidRequest(String),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("LLM returned no content")]
    EmptyResponse,

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),
}

/// Chat completion backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Model name used for pricing and logs
    fn model(&self) -> &str;
}
