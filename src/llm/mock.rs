// Scripted LLM client - replays canned responses, no network

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::traits::{Completion, CompletionRequest, LlmClient, LlmError};
use crate::usage::TokenUsage;

/// Returns queued responses in order and records every request it receives
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    usage_per_call: Option<TokenUsage>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for response in responses {
            client.push_response(response);
        }
        client
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage_per_call = Some(usage);
        self
    }

    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(response.into()));
        }
    }

    pub fn push_failure(&self, error: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(error.into()));
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self
            .responses
            .lock()
            .map_err(|e| LlmError::Api(e.to_string()))?
            .pop_front();

        match next {
            Some(Ok(content)) => Ok(Completion {
                content,
                usage: self.usage_per_call,
            }),
            Some(Err(error)) => Err(LlmError::Api(error)),
            None => Err(LlmError::EmptyResponse),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
