use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::funnel::{Category, FunnelEvent};

pub mod commands;

#[derive(Parser)]
#[command(name = "outreach")]
#[command(about = "Cold outreach assistant that walks a prospect through the sales funnel")]
#[command(long_about = "Outreach drives one prospect through warm-up, feedback collection, \
                       follow-ups and hand-over to Stage 1, with an AI assistant proposing \
                       the next step. Start with 'outreach chat'.")]
pub struct Cli {
    /// Configuration file to load instead of outreach.toml / .outreach-rc
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive session with the assistant (default)
    Chat,
    /// Show instructions and allowed actions per funnel phase
    Describe {
        /// Only show this phase (e.g. collectFeedback)
        #[arg(long, help = "Phase to describe; all phases when omitted")]
        phase: Option<String>,
    },
    /// Replay funnel events offline and print every transition
    Simulate {
        /// Events to apply, in order
        #[arg(value_enum, required = true)]
        events: Vec<EventArg>,
        /// Override the configured follow-up budget
        #[arg(long, help = "Maximum follow-up attempts before archiving")]
        max_follow_ups: Option<u32>,
    },
    /// Write a default outreach.toml
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, help = "Overwrite an existing outreach.toml")]
        force: bool,
        /// Show what would be written without making changes
        #[arg(long, help = "Print the configuration instead of writing it")]
        dry_run: bool,
    },
}

/// Funnel events as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventArg {
    MessageGenerated,
    AskedAboutBusiness,
    PositiveOrNeutral,
    NoResponse,
    NegativeResponse,
    ProspectArchived,
    Stage1Reached,
}

impl From<EventArg> for FunnelEvent {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::MessageGenerated => FunnelEvent::MessageGenerated,
            EventArg::AskedAboutBusiness => Category::AskedAboutBusiness.into(),
            EventArg::PositiveOrNeutral => Category::PositiveOrNeutral.into(),
            EventArg::NoResponse => Category::NoResponse.into(),
            EventArg::NegativeResponse => Category::NegativeResponse.into(),
            EventArg::ProspectArchived => FunnelEvent::ProspectArchived,
            EventArg::Stage1Reached => FunnelEvent::Stage1Reached,
        }
    }
}
