use anyhow::Result;

use crate::cli::commands::Command;
use crate::funnel::{describe, Capabilities, Phase};

pub struct DescribeCommand {
    pub phase: Option<String>,
}

impl DescribeCommand {
    pub fn new(phase: Option<String>) -> Self {
        Self { phase }
    }

    fn phases(&self) -> Result<Vec<Phase>> {
        match &self.phase {
            Some(name) => Ok(vec![name.parse::<Phase>()?]),
            None => Ok(Phase::ALL.to_vec()),
        }
    }
}

pub fn render(capabilities: &Capabilities) -> String {
    let marker = if capabilities.phase.is_terminal() { "🏁" } else { "📍" };
    let actions = if capabilities.allowed_actions.is_empty() {
        "(none)".to_string()
    } else {
        capabilities
            .allowed_actions
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{marker} {}\n   🧰 Actions: {actions}\n   📝 {}",
        capabilities.phase, capabilities.instructions
    )
}

impl Command for DescribeCommand {
    async fn execute(&self) -> Result<()> {
        println!("📋 Outreach funnel phases");
        println!("========================");
        println!();
        for phase in self.phases()? {
            println!("{}", render(&describe(phase)));
            println!();
        }
        Ok(())
    }
}
