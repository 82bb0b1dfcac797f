use anyhow::Result;

use crate::cli::commands::Command;
use crate::funnel::{describe, FunnelEvent, OutreachStateMachine, ProspectId, RetryPolicy};

/// Offline replay of a sequence of funnel events
pub struct SimulateCommand {
    pub prospect_id: ProspectId,
    pub policy: RetryPolicy,
    pub events: Vec<FunnelEvent>,
}

impl SimulateCommand {
    pub fn new(prospect_id: ProspectId, policy: RetryPolicy, events: Vec<FunnelEvent>) -> Self {
        Self {
            prospect_id,
            policy,
            events,
        }
    }

    /// Apply every event, collecting one line per event. Rejections do not stop the replay.
    pub fn run(&self) -> (OutreachStateMachine, Vec<String>) {
        let mut machine = OutreachStateMachine::new(self.prospect_id.clone(), self.policy);
        let mut lines = Vec::with_capacity(self.events.len());

        for (index, event) in self.events.iter().enumerate() {
            let line = match machine.handle(*event) {
                Ok(record) => format!(
                    "{:>2}. ✅ {} : {} → {} (follow-up tries: {})",
                    index + 1,
                    event,
                    record.from,
                    record.to,
                    record.follow_up_tries
                ),
                Err(e) => format!("{:>2}. ❌ {} : {}", index + 1, event, e),
            };
            lines.push(line);
        }

        (machine, lines)
    }
}

impl Command for SimulateCommand {
    async fn execute(&self) -> Result<()> {
        println!(
            "🧪 Simulating {} events for {} (max follow-ups: {})",
            self.events.len(),
            self.prospect_id,
            self.policy.max_follow_up_attempts()
        );
        println!();

        let (machine, lines) = self.run();
        for line in lines {
            println!("{line}");
        }

        let context = machine.context();
        let capabilities = describe(context.phase());
        println!();
        println!("📊 Final context:");
        println!("   📍 Phase: {}", context.phase());
        println!("   🔁 Follow-up tries: {}", context.follow_up_tries());
        if capabilities.allowed_actions.is_empty() {
            println!("   🏁 Finished, no further actions");
        } else {
            let names: Vec<&str> = capabilities.allowed_actions.iter().map(|a| a.name()).collect();
            println!("   🧰 Next actions: {}", names.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::{Category, Phase};

    #[test]
    fn test_replay_continues_after_rejection() {
        let command = SimulateCommand::new(
            ProspectId::new("PROSPECT_JOHN_DOE"),
            RetryPolicy::default(),
            vec![
                FunnelEvent::MessageGenerated,
                FunnelEvent::MessageGenerated,
                Category::NegativeResponse.into(),
                FunnelEvent::ProspectArchived,
            ],
        );

        let (machine, lines) = command.run();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("❌"));
        assert_eq!(machine.phase(), Phase::Archived);
    }

    #[test]
    fn test_execute_with_exhausted_budget() {
        let command = SimulateCommand::new(
            ProspectId::new("PROSPECT_JOHN_DOE"),
            RetryPolicy::new(2).unwrap(),
            vec![FunnelEvent::MessageGenerated, Category::NoResponse.into()],
        );

        tokio_test::block_on(command.execute()).unwrap();
        assert_eq!(command.run().0.context().follow_up_tries(), 1);
    }
}
