// Token and cost accounting for model calls

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Model used for pricing when a model is missing from the table
pub const FALLBACK_PRICING_MODEL: &str = "gpt-4o-mini";

/// USD per 1M tokens, (input, output)
const TOKEN_PRICES: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4", 30.00, 60.00),
    ("gpt-3.5-turbo", 0.50, 1.50),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Why a model call was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPurpose {
    MainChat,
    ActionNarration,
    Drafting,
    Classification,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Cost {
    pub input: f64,
    pub output: f64,
}

impl Cost {
    pub fn total(&self) -> f64 {
        self.input + self.output
    }
}

/// Price `usage` for `model`. Unknown models are priced as gpt-4o-mini.
pub fn calculate_cost(model: &str, usage: &TokenUsage) -> Cost {
    let (input_price, output_price) = match price_for(model) {
        Some(prices) => prices,
        None => {
            warn!(model = %model, "Unknown model pricing, using {} pricing", FALLBACK_PRICING_MODEL);
            price_for(FALLBACK_PRICING_MODEL).unwrap_or((0.0, 0.0))
        }
    };

    Cost {
        input: usage.prompt_tokens as f64 / 1_000_000.0 * input_price,
        output: usage.completion_tokens as f64 / 1_000_000.0 * output_price,
    }
}

fn price_for(model: &str) -> Option<(f64, f64)> {
    TOKEN_PRICES
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|(_, input, output)| (*input, *output))
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiCallRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub purpose: CallPurpose,
    pub usage: TokenUsage,
    pub cost: Cost,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PurposeTotals {
    pub calls: usize,
    pub total_tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageSummary {
    pub calls: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_cost: f64,
    pub by_purpose: BTreeMap<CallPurpose, PurposeTotals>,
}

impl UsageSummary {
    pub fn formatted_cost(&self) -> String {
        format!("${:.6}", self.total_cost)
    }
}

/// Append-only ledger shared by every component that talks to the model
#[derive(Debug, Default)]
pub struct UsageLedger {
    records: Mutex<Vec<ApiCallRecord>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, model: &str, purpose: CallPurpose, usage: TokenUsage) -> ApiCallRecord {
        let record = ApiCallRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            model: model.to_string(),
            purpose,
            usage,
            cost: calculate_cost(model, &usage),
        };

        info!(
            model = %record.model,
            purpose = ?record.purpose,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            cost = record.cost.total(),
            "Model call recorded"
        );

        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        record
    }

    pub fn records(&self) -> Vec<ApiCallRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn summary(&self) -> UsageSummary {
        let records = self.records();
        let mut summary = UsageSummary::default();
        for record in &records {
            summary.calls += 1;
            summary.prompt_tokens += record.usage.prompt_tokens;
            summary.completion_tokens += record.usage.completion_tokens;
            summary.total_cost += record.cost.total();

            let totals = summary.by_purpose.entry(record.purpose).or_default();
            totals.calls += 1;
            totals.total_tokens += record.usage.total_tokens();
            totals.cost += record.cost.total();
        }
        summary
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        info!(
            "Session usage: calls={}, prompt_tokens={}, completion_tokens={}, cost={}",
            summary.calls,
            summary.prompt_tokens,
            summary.completion_tokens,
            summary.formatted_cost()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_pricing() {
        let cost = calculate_cost("gpt-4o", &TokenUsage::new(1_000_000, 500_000));
        assert!((cost.input - 2.5).abs() < 1e-9);
        assert!((cost.output - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_uses_fallback_pricing() {
        let usage = TokenUsage::new(2_000, 1_000);
        assert_eq!(
            calculate_cost("some-local-model", &usage),
            calculate_cost(FALLBACK_PRICING_MODEL, &usage)
        );
    }

    #[test]
    fn test_summary_groups_by_purpose() {
        let ledger = UsageLedger::new();
        ledger.record("gpt-4o-mini", CallPurpose::MainChat, TokenUsage::new(100, 20));
        ledger.record("gpt-4o-mini", CallPurpose::MainChat, TokenUsage::new(50, 10));
        ledger.record("gpt-4o-mini", CallPurpose::Classification, TokenUsage::new(30, 5));

        let summary = ledger.summary();
        assert_eq!(summary.calls, 3);
        assert_eq!(summary.prompt_tokens, 180);
        assert_eq!(summary.by_purpose[&CallPurpose::MainChat].calls, 2);
        assert_eq!(summary.by_purpose[&CallPurpose::MainChat].total_tokens, 180);
        assert_eq!(summary.by_purpose[&CallPurpose::Classification].calls, 1);
        assert!(summary.formatted_cost().starts_with('$'));
    }
}
