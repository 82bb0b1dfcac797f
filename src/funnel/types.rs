// Core types for the outreach funnel state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Phases of the cold outreach workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Draft the first outreach message
    GenerateWarmup,
    /// Waiting for (and classifying) the prospect's reply
    CollectFeedback,
    /// Draft a message that builds on a positive reply
    GenerateContextual,
    /// Draft a nudge after silence
    GenerateFollowUp,
    /// Confirm archival
    Archive,
    /// Confirm promotion to stage 1
    AdvanceToStage1,
    /// Prospect archived (terminal)
    Archived,
    /// Prospect handed over to stage 1 (terminal)
    AdvancedToStage1,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::GenerateWarmup,
        Phase::CollectFeedback,
        Phase::GenerateContextual,
        Phase::GenerateFollowUp,
        Phase::Archive,
        Phase::AdvanceToStage1,
        Phase::Archived,
        Phase::AdvancedToStage1,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Archived | Phase::AdvancedToStage1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::GenerateWarmup => "generateWarmup",
            Phase::CollectFeedback => "collectFeedback",
            Phase::GenerateContextual => "generateContextual",
            Phase::GenerateFollowUp => "generateFollowUp",
            Phase::Archive => "archive",
            Phase::AdvanceToStage1 => "advanceToStage1",
            Phase::Archived => "archived",
            Phase::AdvancedToStage1 => "advancedToStage1",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown phase '{0}'")]
pub struct ParsePhaseError(pub String);

impl FromStr for Phase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParsePhaseError(s.to_string()))
    }
}

/// Canonical outcomes of classifying a prospect's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// They asked about the salesperson's business or work
    AskedAboutBusiness,
    /// Engaged positively (or neutrally) without asking about business
    PositiveOrNeutral,
    /// No reply at all
    NoResponse,
    /// Replied negatively
    NegativeResponse,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::AskedAboutBusiness,
        Category::PositiveOrNeutral,
        Category::NoResponse,
        Category::NegativeResponse,
    ];

    /// Wire name used in prompts and model output
    pub fn as_str(self) -> &'static str {
        match self {
            Category::AskedAboutBusiness => "ASKED_ABOUT_BUSINESS",
            Category::PositiveOrNeutral => "POSITIVE_OR_NEUTRAL",
            Category::NoResponse => "NO_RESPONSE",
            Category::NegativeResponse => "NEGATIVE_RESPONSE",
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            Category::AskedAboutBusiness => "If they explicitly asked about your business/work",
            Category::PositiveOrNeutral => "If they engaged positively but didn't ask about business",
            Category::NoResponse => "If there was no response from the prospect",
            Category::NegativeResponse => "If they responded negatively",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown classification category '{0}'")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(['-', ' '], "_");
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Events accepted by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunnelEvent {
    /// A drafting collaborator finished a message
    MessageGenerated,
    /// A prospect reply was classified
    Classified(Category),
    /// Archival was confirmed
    ProspectArchived,
    /// Promotion to stage 1 was confirmed
    Stage1Reached,
}

impl From<Category> for FunnelEvent {
    fn from(category: Category) -> Self {
        FunnelEvent::Classified(category)
    }
}

impl fmt::Display for FunnelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunnelEvent::MessageGenerated => f.write_str("MESSAGE_GENERATED"),
            FunnelEvent::Classified(category) => write!(f, "{category}"),
            FunnelEvent::ProspectArchived => f.write_str("PROSPECT_ARCHIVED"),
            FunnelEvent::Stage1Reached => f.write_str("STAGE_1_REACHED"),
        }
    }
}

/// Actions the assistant may invoke, gated per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    GenerateWarmupMessage,
    GenerateContextualMessage,
    GenerateFollowUpMessage,
    CollectFeedback,
    ArchiveProspect,
    MoveToStage1,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::GenerateWarmupMessage,
        Action::GenerateContextualMessage,
        Action::GenerateFollowUpMessage,
        Action::CollectFeedback,
        Action::ArchiveProspect,
        Action::MoveToStage1,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::GenerateWarmupMessage => "generateWarmupMessage",
            Action::GenerateContextualMessage => "generateContextualMessage",
            Action::GenerateFollowUpMessage => "generateFollowUpMessage",
            Action::CollectFeedback => "collectFeedback",
            Action::ArchiveProspect => "archiveProspect",
            Action::MoveToStage1 => "moveToStage1",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown action '{0}'")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s.trim())
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

/// Opaque prospect identifier, fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProspectId(String);

impl ProspectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProspectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-prospect progress through the funnel
///
/// Fields are only mutated by the state machine; everything else reads
/// through the accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProspectContext {
    prospect_id: ProspectId,
    phase: Phase,
    follow_up_tries: u32,
}

impl ProspectContext {
    pub fn new(prospect_id: ProspectId) -> Self {
        Self {
            prospect_id,
            phase: Phase::GenerateWarmup,
            follow_up_tries: 0,
        }
    }

    pub fn prospect_id(&self) -> &ProspectId {
        &self.prospect_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn follow_up_tries(&self) -> u32 {
        self.follow_up_tries
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn increment_follow_up_tries(&mut self) {
        self.follow_up_tries += 1;
    }

    pub(crate) fn reset_follow_up_tries(&mut self) {
        self.follow_up_tries = 0;
    }

    #[cfg(test)]
    pub(crate) fn at(prospect_id: &str, phase: Phase, follow_up_tries: u32) -> Self {
        Self {
            prospect_id: ProspectId::new(prospect_id),
            phase,
            follow_up_tries,
        }
    }
}
