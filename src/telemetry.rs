use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;
use crate::funnel::ProspectId;

/// Initialize structured logging.
///
/// Logs go to stderr so the chat transcript on stdout stays readable.
/// RUST_LOG takes precedence over the configured level.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    if config.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    }

    tracing::debug!("Outreach telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the calls of one session
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping everything that happens for one prospect session
pub fn create_session_span(prospect_id: &ProspectId, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "outreach_session",
        prospect.id = %prospect_id,
        correlation.id = correlation_id,
    )
}
