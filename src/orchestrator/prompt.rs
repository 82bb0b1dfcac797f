// Prompt text for the assistant persona and the per-turn state briefing

use serde_json::{json, Value};

use crate::funnel::{Action, Capabilities, Category, Phase, ProspectContext};
use crate::prospect::ProspectProfile;

pub const STEVE_PERSONA: &str = "You are Steve, an AI assistant helping salespeople manage their prospects. \
You are professional, focused, and excellent at understanding prospect responses and suggesting appropriate next steps.

Your primary responsibilities are:
1. Help salespeople interpret prospect responses and decide on next actions
2. Generate messages for the salesperson to send to prospects
3. Maintain a natural, professional conversation flow
4. Guide prospects towards asking about the business while keeping engagement genuine

You communicate clearly with salespeople about what state the prospect is in, \
what the next steps should be, and why you recommend certain actions.

You are direct and practical in your advice, but always maintain a helpful and supportive tone. \
Before calling an action, briefly suggest it in natural language. \
Call the appropriate action when the salesperson asks for it or when you think it is appropriate.";

/// Briefing for the current phase, rebuilt before every model call
pub fn state_instructions(profile: &ProspectProfile, context: &ProspectContext, capabilities: &Capabilities) -> String {
    let mut prompt = format!(
        "Current Prospect: {} ({})\nCurrent State: {}\n\nCURRENT INSTRUCTIONS:\n{}\n",
        context.prospect_id(),
        profile.full_name(),
        context.phase(),
        capabilities.instructions
    );

    if context.phase() == Phase::CollectFeedback {
        prompt.push_str(
            "\nCLASSIFICATION:\nWhen the salesperson tells you about the prospect's response, call collectFeedback \
             with their reply verbatim. It will be classified into one of these categories:\n",
        );
        for category in Category::ALL {
            prompt.push_str(&format!("- {}: {}\n", category.as_str(), category.guidance()));
        }
    } else if capabilities.allowed_actions.is_empty() {
        prompt.push_str("\nNo actions are available. Answer questions about the outcome only.\n");
    } else {
        let names: Vec<&str> = capabilities.allowed_actions.iter().map(|a| a.name()).collect();
        prompt.push_str(&format!(
            "\nACTIONS AVAILABLE:\nThe current state allows these actions: {}\n\
             Use the appropriate action based on the current state instructions.\n",
            names.join(", ")
        ));
    }

    prompt.push_str(
        "\nPlease help the salesperson understand the current situation and take appropriate action \
         based on the state instructions above.",
    );
    prompt
}

fn action_spec(action: Action) -> Value {
    let (description, parameters) = match action {
        Action::GenerateWarmupMessage => (
            "Generate an initial warm-up message for the salesperson to send to a cold prospect.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        Action::GenerateContextualMessage => (
            "Generate a contextual message based on the previous interaction for the salesperson to send.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        Action::GenerateFollowUpMessage => (
            "Generate a follow-up message for the salesperson to send to an unresponsive prospect.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        Action::CollectFeedback => (
            "Record the prospect's reply and classify it to determine the next step in the sales process.",
            json!({
                "type": "object",
                "properties": {
                    "feedback": {
                        "type": "string",
                        "description": "The prospect's reply verbatim. Omit when the prospect did not respond."
                    }
                },
                "required": []
            }),
        ),
        Action::ArchiveProspect => (
            "Archive a prospect after negative feedback or no response.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        Action::MoveToStage1 => (
            "Move a prospect to Stage 1 when they show interest.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
    };

    json!({
        "name": action.name(),
        "description": description,
        "parameters": parameters,
    })
}

/// Action specs and call format for the allowed actions only
pub fn action_protocol(allowed: &[Action]) -> String {
    if allowed.is_empty() {
        return "No actions can be called right now. Reply in plain text.".to_string();
    }

    let specs: Vec<Value> = allowed.iter().map(|a| action_spec(*a)).collect();
    let rendered = serde_json::to_string_pretty(&specs).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You can call these actions:\n{rendered}\n\n\
         To call an action, end your reply with a single JSON object on its own:\n\
         {{\"action\": \"<name>\", \"args\": {{...}}}}\n\
         Call at most one action per reply. When no action is needed, reply in plain text without JSON."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::{describe, ProspectId};

    fn context_in(phase: Phase) -> ProspectContext {
        ProspectContext::at("PROSPECT_JOHN_DOE", phase, 0)
    }

    #[test]
    fn test_collect_feedback_briefing_lists_categories() {
        let ctx = context_in(Phase::CollectFeedback);
        let prompt = state_instructions(&ProspectProfile::default(), &ctx, &describe(ctx.phase()));

        assert!(prompt.contains("Current Prospect: PROSPECT_JOHN_DOE (John Doe)"));
        assert!(prompt.contains("Current State: collectFeedback"));
        for category in Category::ALL {
            assert!(prompt.contains(category.as_str()));
        }
    }

    #[test]
    fn test_briefing_lists_allowed_actions() {
        let ctx = ProspectContext::new(ProspectId::new("PROSPECT_JOHN_DOE"));
        let prompt = state_instructions(&ProspectProfile::default(), &ctx, &describe(ctx.phase()));
        assert!(prompt.contains("allows these actions: generateWarmupMessage"));
    }

    #[test]
    fn test_protocol_only_mentions_allowed_actions() {
        let protocol = action_protocol(&[Action::ArchiveProspect]);
        assert!(protocol.contains("archiveProspect"));
        assert!(!protocol.contains("moveToStage1"));
    }

    #[test]
    fn test_terminal_protocol_has_no_actions() {
        let protocol = action_protocol(&describe(Phase::Archived).allowed_actions);
        assert!(protocol.starts_with("No actions can be called"));
    }
}
