// LLM layer: client trait plus OpenAI-compatible and scripted implementations

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::ScriptedLlmClient;
pub use openai::OpenAiClient;
pub use traits::{Completion, CompletionRequest, LlmClient, LlmError, Message, Role};
