use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::funnel::{RetryPolicy, DEFAULT_MAX_FOLLOW_UP_ATTEMPTS};
use crate::prospect::ProspectProfile;

pub const DEFAULT_CONFIG_FILE: &str = "outreach.toml";

/// Main configuration structure for the outreach assistant
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutreachConfig {
    /// Language model settings
    pub llm: LlmConfig,
    /// Funnel behaviour
    pub funnel: FunnelConfig,
    /// Message drafting settings
    pub drafting: DraftingConfig,
    /// The prospect this session works on
    pub prospect: ProspectProfile,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat model name
    pub model: String,
    /// OpenAI-compatible endpoint (defaults to api.openai.com)
    pub base_url: Option<String>,
    /// API key (falls back to OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// Temperature for the assistant conversation
    pub temperature: f32,
    /// Temperature for drafting prospect messages
    pub drafting_temperature: f32,
    /// Completion token cap for drafting and classification
    pub max_tokens: u32,
    /// Per-request timeout
    pub request_timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.2,
            drafting_temperature: 1.0,
            max_tokens: 400,
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FunnelConfig {
    /// Follow-ups allowed before a silent prospect is archived
    pub max_follow_up_attempts: u32,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            max_follow_up_attempts: DEFAULT_MAX_FOLLOW_UP_ATTEMPTS,
        }
    }
}

/// Shape of drafted messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftingVariant {
    /// One plain message
    #[default]
    Single,
    /// Voice message, text message and call script
    MultiChannel,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DraftingConfig {
    pub variant: DraftingVariant,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON structured logs instead of compact text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("funnel.max_follow_up_attempts must be at least 1")]
    ZeroFollowUpBudget,
    #[error("{field} must be between 0.0 and 2.0, got {value}")]
    TemperatureOutOfRange { field: &'static str, value: f32 },
    #[error("llm.request_timeout_seconds must be greater than zero")]
    ZeroTimeout,
}

impl OutreachConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (outreach.toml, .outreach-rc) or an explicit path
    /// 3. Environment variables (OUTREACH__SECTION__KEY)
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match explicit_path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    builder = builder.add_source(File::with_name("outreach"));
                }
                if Path::new(".outreach-rc").exists() {
                    builder = builder.add_source(
                        File::new(".outreach-rc", config::FileFormat::Toml),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("OUTREACH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: OutreachConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.funnel.max_follow_up_attempts == 0 {
            return Err(ConfigError::ZeroFollowUpBudget);
        }
        for (field, value) in [
            ("llm.temperature", self.llm.temperature),
            ("llm.drafting_temperature", self.llm.drafting_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::TemperatureOutOfRange { field, value });
            }
        }
        if self.llm.request_timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(self.funnel.max_follow_up_attempts).map_err(|_| ConfigError::ZeroFollowUpBudget)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists. Runs before telemetry, so the caller logs the result.
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        dotenvy::from_path(path)?;
        Ok(true)
    }
}
