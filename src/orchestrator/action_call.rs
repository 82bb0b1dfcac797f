// Extracting action calls from assistant replies

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{"action": "generateWarmupMessage", "args": {}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    pub action: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssistantOutput {
    /// Plain reply for the salesperson
    Reply(String),
    /// Action call, with any prose the model wrote before it
    Call { preamble: String, call: ActionCall },
}

/// Split model output into prose and an optional action call.
///
/// JSON is taken from a ```json fence when present, else from the first `{`
/// to the last `}`. Text that does not parse as an action call is a reply.
pub fn parse_llm_output(output: &str) -> AssistantOutput {
    let trimmed = output.trim();

    let (start, json_str) = if let Some(fence) = trimmed.find("```json") {
        let rest = &trimmed[fence + 7..];
        let body = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
        (fence, body.trim())
    } else {
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(s), Some(e)) if s < e => (s, &trimmed[s..=e]),
            _ => return AssistantOutput::Reply(trimmed.to_string()),
        }
    };

    match serde_json::from_str::<ActionCall>(json_str) {
        Ok(call) if !call.action.trim().is_empty() => AssistantOutput::Call {
            preamble: trimmed[..start].trim().to_string(),
            call,
        },
        _ => AssistantOutput::Reply(trimmed.to_string()),
    }
}
