use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DraftingVariant;
use crate::gateway::GatewayError;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::usage::{CallPurpose, UsageLedger};

/// What kind of message the drafting model should write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftIntent {
    Warmup,
    Contextual,
    /// `attempt` is 1-based
    FollowUp { attempt: u32 },
}

impl DraftIntent {
    fn brief(&self) -> String {
        match self {
            DraftIntent::Warmup => "Write a short, friendly first message to a cold prospect. \
                 Reference their role or industry, do not pitch anything, and invite a reply."
                .to_string(),
            DraftIntent::Contextual => "The prospect replied positively. Write a short message that \
                 continues the conversation naturally and gives them an opening to ask what we do."
                .to_string(),
            DraftIntent::FollowUp { attempt } => format!(
                "The prospect has not replied. Write follow-up number {attempt}: a brief, polite nudge \
                 that does not repeat the previous message or sound pushy."
            ),
        }
    }
}

impl fmt::Display for DraftIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftIntent::Warmup => f.write_str("warmup"),
            DraftIntent::Contextual => f.write_str("contextual"),
            DraftIntent::FollowUp { attempt } => write!(f, "follow-up #{attempt}"),
        }
    }
}

/// The same outreach expressed for three channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelBundle {
    pub voice_message: String,
    pub text_message: String,
    pub call_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DraftedMessage {
    Channels(ChannelBundle),
    Single(String),
}

impl fmt::Display for DraftedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftedMessage::Single(text) => f.write_str(text),
            DraftedMessage::Channels(bundle) => write!(
                f,
                "Voice message: {}\nText message: {}\nCall script: {}",
                bundle.voice_message, bundle.text_message, bundle.call_content
            ),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageDrafter: Send + Sync {
    async fn draft(&self, intent: DraftIntent, prospect: &str) -> Result<DraftedMessage, GatewayError>;
}

/// Fixed template used when drafting fails
pub fn fallback_message(intent: DraftIntent, variant: DraftingVariant) -> DraftedMessage {
    let text = match intent {
        DraftIntent::Warmup => "Hi! I came across your profile and was impressed by your work. \
             I'd love to connect and learn more about what you're working on. Best regards!",
        DraftIntent::Contextual => "That's awesome! I've been working on some interesting projects \
             in a related area. What's been keeping you busy lately?",
        DraftIntent::FollowUp { .. } => "Hi again! Just wanted to follow up on my previous message. \
             Hope you're doing well!",
    };

    match variant {
        DraftingVariant::Single => DraftedMessage::Single(text.to_string()),
        DraftingVariant::MultiChannel => DraftedMessage::Channels(ChannelBundle {
            voice_message: text.to_string(),
            text_message: text.to_string(),
            call_content: text.to_string(),
        }),
    }
}

/// Draft, substituting the fixed template when the gateway fails
pub async fn draft_or_fallback(
    drafter: &dyn MessageDrafter,
    intent: DraftIntent,
    prospect: &str,
    variant: DraftingVariant,
) -> (DraftedMessage, bool) {
    match drafter.draft(intent, prospect).await {
        Ok(message) => (message, false),
        Err(e) => {
            warn!(intent = %intent, error = %e, "Drafting failed, using template message");
            (fallback_message(intent, variant), true)
        }
    }
}

/// Drafter backed by a chat model
pub struct LlmMessageDrafter {
    llm: Arc<dyn LlmClient>,
    ledger: Option<Arc<UsageLedger>>,
    variant: DraftingVariant,
    temperature: f32,
    max_tokens: u32,
}

impl LlmMessageDrafter {
    pub fn new(llm: Arc<dyn LlmClient>, variant: DraftingVariant, temperature: f32, max_tokens: u32) -> Self {
        Self {
            llm,
            ledger: None,
            variant,
            temperature,
            max_tokens,
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn variant(&self) -> DraftingVariant {
        self.variant
    }

    fn format_instructions(&self) -> &'static str {
        match self.variant {
            DraftingVariant::Single => "Reply with the message text only, without quotes or commentary.",
            DraftingVariant::MultiChannel => "Reply with only a JSON object: \
                 {\"voiceMessage\": \"<script for a short voice note>\", \
                 \"textMessage\": \"<chat message>\", \
                 \"callContent\": \"<talking points for a call>\"}",
        }
    }

    fn parse(&self, content: &str) -> Result<DraftedMessage, GatewayError> {
        let trimmed = content.trim();
        match self.variant {
            DraftingVariant::Single => {
                let text = trimmed.trim_matches('"').trim();
                if text.is_empty() {
                    return Err(GatewayError::Unparseable(content.to_string()));
                }
                Ok(DraftedMessage::Single(text.to_string()))
            }
            DraftingVariant::MultiChannel => {
                let start = trimmed.find('{');
                let end = trimmed.rfind('}');
                let json = match (start, end) {
                    (Some(s), Some(e)) if s < e => &trimmed[s..=e],
                    _ => return Err(GatewayError::Unparseable(content.to_string())),
                };
                let bundle: ChannelBundle = serde_json::from_str(json)
                    .map_err(|e| GatewayError::Unparseable(format!("{e}: {json}")))?;
                Ok(DraftedMessage::Channels(bundle))
            }
        }
    }
}

#[async_trait]
impl MessageDrafter for LlmMessageDrafter {
    async fn draft(&self, intent: DraftIntent, prospect: &str) -> Result<DraftedMessage, GatewayError> {
        let request = CompletionRequest::new(
            vec![
                Message::system(format!(
                    "You write outreach messages that a salesperson sends to a prospect. {}",
                    self.format_instructions()
                )),
                Message::user(format!("{prospect}\n\n{}", intent.brief())),
            ],
            self.temperature,
        )
        .with_max_tokens(self.max_tokens);

        let completion = self.llm.complete(&request).await?;
        if let (Some(ledger), Some(usage)) = (&self.ledger, completion.usage) {
            ledger.record(self.llm.model(), CallPurpose::Drafting, usage);
        }

        let message = self.parse(&completion.content)?;
        debug!(intent = %intent, "Message drafted");
        Ok(message)
    }
}
