use anyhow::Result;
use clap::Parser;

use cold_outreach::cli::commands::{ChatCommand, Command, DescribeCommand, InitCommand, SimulateCommand};
use cold_outreach::cli::{Cli, Commands};
use cold_outreach::config::OutreachConfig;
use cold_outreach::funnel::{FunnelEvent, RetryPolicy};
use cold_outreach::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_file_loaded = OutreachConfig::load_env_file()?;

    // init writes the file, so it must not require an existing valid one
    if let Some(Commands::Init { force, dry_run }) = cli.command {
        return tokio::runtime::Runtime::new()?.block_on(async {
            let command = match &cli.config {
                Some(path) => InitCommand::new(force, dry_run).with_path(path),
                None => InitCommand::new(force, dry_run),
            };
            command.execute().await
        });
    }

    let config = OutreachConfig::load(cli.config.as_deref())?;
    init_telemetry(&config.observability)?;
    if env_file_loaded {
        tracing::info!("Loaded environment variables from .env file");
    }

    match cli.command {
        // Default behavior: no subcommand starts a chat
        None | Some(Commands::Chat) => {
            tokio::runtime::Runtime::new()?.block_on(async { ChatCommand::new(config).execute().await })
        }
        Some(Commands::Describe { phase }) => {
            tokio::runtime::Runtime::new()?.block_on(async { DescribeCommand::new(phase).execute().await })
        }
        Some(Commands::Simulate { events, max_follow_ups }) => {
            let policy = match max_follow_ups {
                Some(max) => RetryPolicy::new(max)?,
                None => config.retry_policy()?,
            };
            let events: Vec<FunnelEvent> = events.into_iter().map(FunnelEvent::from).collect();
            let command = SimulateCommand::new(config.prospect.prospect_id(), policy, events);
            tokio::runtime::Runtime::new()?.block_on(async { command.execute().await })
        }
        Some(Commands::Init { .. }) => Ok(()),
    }
}
