use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::funnel::Category;
use crate::gateway::GatewayError;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::usage::{CallPurpose, UsageLedger};

/// Category picked for a prospect reply, with the model's reasoning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub rationale: String,
    /// Set when the category is the safe default rather than a real verdict
    #[serde(skip)]
    pub fallback: bool,
}

impl Classification {
    pub fn new(category: Category, rationale: impl Into<String>) -> Self {
        Self {
            category,
            rationale: rationale.into(),
            fallback: false,
        }
    }

    fn safe_default(reason: &str) -> Self {
        Self {
            category: Category::PositiveOrNeutral,
            rationale: format!("Classification unavailable ({reason}); treating the reply as positive or neutral"),
            fallback: true,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseClassifier: Send + Sync {
    /// Classify `feedback` from the prospect described by `prospect`
    async fn classify(&self, feedback: &str, prospect: &str) -> Result<Classification, GatewayError>;
}

/// Classify, substituting `PositiveOrNeutral` when the gateway fails.
///
/// The funnel relies on this: it is never handed an unknown category.
pub async fn classify_or_default(
    classifier: &dyn ResponseClassifier,
    feedback: &str,
    prospect: &str,
) -> Classification {
    match classifier.classify(feedback, prospect).await {
        Ok(classification) => classification,
        Err(e) => {
            warn!(error = %e, "Classification failed, defaulting to {}", Category::PositiveOrNeutral);
            Classification::safe_default(&e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(alias = "classification")]
    category: String,
    #[serde(default)]
    rationale: Option<String>,
}

const CATEGORY_PATTERN: &str =
    r"\b(ASKED_ABOUT_BUSINESS|POSITIVE_OR_NEUTRAL|NO_RESPONSE|NEGATIVE_RESPONSE)\b";

static CATEGORY_RE: std::sync::LazyLock<Result<Regex, regex::Error>> =
    std::sync::LazyLock::new(|| Regex::new(CATEGORY_PATTERN));

/// Extract a classification from raw model output.
///
/// Accepts a JSON object (optionally fenced) with `category` and
/// `rationale`, or free text naming exactly one category. Anything else is
/// an error so the caller can apply its fallback.
pub fn parse_classification(output: &str) -> Result<Classification, GatewayError> {
    let trimmed = output.trim();

    if let Some(json) = extract_json_object(trimmed) {
        let raw: RawClassification = serde_json::from_str(json)
            .map_err(|e| GatewayError::Unparseable(format!("{e}: {json}")))?;
        let category = raw
            .category
            .parse::<Category>()
            .map_err(|e| GatewayError::Unparseable(e.to_string()))?;
        return Ok(Classification::new(category, raw.rationale.unwrap_or_default()));
    }

    let pattern = CATEGORY_RE
        .as_ref()
        .map_err(|e| GatewayError::Unparseable(e.to_string()))?;
    let mut found: Vec<Category> = pattern
        .find_iter(&trimmed.to_ascii_uppercase())
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    found.dedup();

    match found.as_slice() {
        [category] => Ok(Classification::new(*category, trimmed)),
        [] => Err(GatewayError::Unparseable(trimmed.to_string())),
        _ => Err(GatewayError::Ambiguous(trimmed.to_string())),
    }
}

fn extract_json_object(text: &str) -> Option<&str> {
    let body = match text.find("```json") {
        Some(start) => {
            let rest = &text[start + 7..];
            rest.find("```").map(|end| &rest[..end]).unwrap_or(rest)
        }
        None => text,
    };
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

/// Classifier backed by a chat model
pub struct LlmResponseClassifier {
    llm: Arc<dyn LlmClient>,
    ledger: Option<Arc<UsageLedger>>,
    max_tokens: u32,
}

impl LlmResponseClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self {
            llm,
            ledger: None,
            max_tokens,
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    fn system_prompt() -> String {
        let categories: Vec<String> = Category::ALL
            .iter()
            .map(|c| format!("- {}: {}", c.as_str(), c.guidance()))
            .collect();
        format!(
            "You classify a sales prospect's reply to an outreach message. \
             Choose exactly one category:\n{}\n\n\
             Respond with only a JSON object: {{\"category\": \"<CATEGORY>\", \"rationale\": \"<one sentence>\"}}",
            categories.join("\n")
        )
    }
}

#[async_trait]
impl ResponseClassifier for LlmResponseClassifier {
    async fn classify(&self, feedback: &str, prospect: &str) -> Result<Classification, GatewayError> {
        let request = CompletionRequest::new(
            vec![
                Message::system(Self::system_prompt()),
                Message::user(format!("Prospect context: {prospect}\n\nProspect's reply:\n{feedback}")),
            ],
            0.0,
        )
        .with_max_tokens(self.max_tokens);

        let completion = self.llm.complete(&request).await?;
        if let (Some(ledger), Some(usage)) = (&self.ledger, completion.usage) {
            ledger.record(self.llm.model(), CallPurpose::Classification, usage);
        }

        let classification = parse_classification(&completion.content)?;
        debug!(category = %classification.category, "Prospect reply classified");
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::usage::TokenUsage;

    #[test]
    fn test_parse_json_classification() {
        let parsed = parse_classification(
            r#"{"category": "ASKED_ABOUT_BUSINESS", "rationale": "They asked what we sell"}"#,
        )
        .unwrap();
        assert_eq!(parsed.category, Category::AskedAboutBusiness);
        assert_eq!(parsed.rationale, "They asked what we sell");
        assert!(!parsed.fallback);
    }

    #[test]
    fn test_parse_fenced_json() {
        let output = "Sure:\n```json\n{\"category\": \"NO_RESPONSE\"}\n```";
        assert_eq!(parse_classification(output).unwrap().category, Category::NoResponse);
    }

    #[test]
    fn test_parse_bare_category_token() {
        let parsed = parse_classification("This is clearly negative_response.").unwrap();
        assert_eq!(parsed.category, Category::NegativeResponse);
    }

    #[test]
    fn test_category_pattern_is_reused_across_calls() {
        assert!(CATEGORY_RE.is_ok());
        for output in ["NO_RESPONSE", "no_response, they ignored it", "```\nNO_RESPONSE\n```"] {
            assert_eq!(parse_classification(output).unwrap().category, Category::NoResponse);
        }
    }

    #[test]
    fn test_unknown_category_is_error() {
        let err = parse_classification(r#"{"category": "INTERESTED_LATER"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Unparseable(_)));
    }

    #[test]
    fn test_two_categories_is_ambiguous() {
        let err = parse_classification("Either NO_RESPONSE or NEGATIVE_RESPONSE").unwrap_err();
        assert!(matches!(err, GatewayError::Ambiguous(_)));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_positive_or_neutral() {
        let mut classifier = MockResponseClassifier::new();
        classifier
            .expect_classify()
            .returning(|_, _| Err(GatewayError::Unparseable("garbage".to_string())));

        let result = classify_or_default(&classifier, "hmm", "John").await;
        assert_eq!(result.category, Category::PositiveOrNeutral);
        assert!(result.fallback);
    }

    #[tokio::test]
    async fn test_llm_classifier_records_usage() {
        let llm = Arc::new(
            ScriptedLlmClient::with_responses([r#"{"category": "POSITIVE_OR_NEUTRAL", "rationale": "friendly"}"#])
                .with_usage(TokenUsage::new(120, 15)),
        );
        let ledger = Arc::new(UsageLedger::new());
        let classifier = LlmResponseClassifier::new(llm.clone(), 200).with_ledger(ledger.clone());

        let result = classifier.classify("Thanks, doing well!", "John Doe, CTO").await.unwrap();

        assert_eq!(result.category, Category::PositiveOrNeutral);
        assert_eq!(ledger.summary().by_purpose[&CallPurpose::Classification].calls, 1);
        let sent = &llm.requests()[0];
        assert!(sent.messages[1].content.contains("Thanks, doing well!"));
    }
}
