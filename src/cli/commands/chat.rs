use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Instrument};

use crate::cli::commands::Command;
use crate::config::OutreachConfig;
use crate::gateway::{LlmMessageDrafter, LlmResponseClassifier};
use crate::llm::{LlmClient, OpenAiClient};
use crate::orchestrator::{ChatOrchestrator, OrchestratorError, TurnReply};
use crate::session::{ProspectSession, SessionError};
use crate::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::telemetry::{create_session_span, generate_correlation_id};
use crate::usage::UsageLedger;

/// Interactive session with the assistant
pub struct ChatCommand {
    config: OutreachConfig,
    llm: Option<Arc<dyn LlmClient>>,
}

impl ChatCommand {
    pub fn new(config: OutreachConfig) -> Self {
        Self { config, llm: None }
    }

    /// Use `llm` instead of the configured OpenAI endpoint
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Wire the model client, gateways and session together
    pub fn build_orchestrator(&self, shutdown: ShutdownSignal) -> Result<ChatOrchestrator> {
        let config = &self.config;
        let llm: Arc<dyn LlmClient> = match &self.llm {
            Some(llm) => Arc::clone(llm),
            None => Arc::new(OpenAiClient::from_config(&config.llm)),
        };
        let ledger = Arc::new(UsageLedger::new());

        let drafter = LlmMessageDrafter::new(
            Arc::clone(&llm),
            config.drafting.variant,
            config.llm.drafting_temperature,
            config.llm.max_tokens,
        )
        .with_ledger(Arc::clone(&ledger));
        let classifier =
            LlmResponseClassifier::new(Arc::clone(&llm), config.llm.max_tokens).with_ledger(Arc::clone(&ledger));

        let session = ProspectSession::new(
            config.prospect.clone(),
            config.retry_policy()?,
            Arc::new(drafter),
            Arc::new(classifier),
            config.drafting.variant,
        )
        .with_shutdown(shutdown);

        Ok(ChatOrchestrator::new(llm, session, ledger).with_sampling(config.llm.temperature, config.llm.max_tokens))
    }

    async fn run_loop(&self, orchestrator: &mut ChatOrchestrator, mut shutdown: ShutdownSignal) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        print_status(orchestrator);

        loop {
            print!("\nYou: ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                _ = shutdown.triggered() => {
                    println!();
                    println!("🛑 Interrupted");
                    break;
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                println!();
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if input.eq_ignore_ascii_case("exit") {
                break;
            }

            match orchestrator.handle_turn(input).await {
                Ok(reply) => {
                    print_reply(&reply);
                    print_status(orchestrator);
                }
                Err(OrchestratorError::Session(SessionError::Cancelled { .. })) => {
                    println!("🛑 Interrupted, pending action discarded");
                    break;
                }
                Err(e) => println!("❌ {e}"),
            }
        }
        Ok(())
    }
}

impl Command for ChatCommand {
    async fn execute(&self) -> Result<()> {
        let coordinator = ShutdownCoordinator::new();
        coordinator.install_signal_handlers()?;

        let mut orchestrator = self.build_orchestrator(coordinator.signal())?;
        let prospect_id = orchestrator.session().context().prospect_id().clone();
        let correlation_id = generate_correlation_id();
        let span = create_session_span(&prospect_id, &correlation_id);

        println!("🤝 Outreach assistant");
        println!("=====================");
        println!("Prospect: {} ({})", orchestrator.session().profile().full_name(), prospect_id);
        println!("Type 'exit' to quit.");

        info!(parent: &span, "Chat session started");
        self.run_loop(&mut orchestrator, coordinator.signal())
            .instrument(span.clone())
            .await?;

        let ledger = Arc::clone(orchestrator.ledger());
        ledger.log_summary();
        print_usage(&ledger);
        info!(parent: &span, "Chat session ended");
        Ok(())
    }
}

fn print_reply(reply: &TurnReply) {
    println!("\nSteve: {}", reply.text);
    if let Some(outcome) = &reply.outcome {
        if let Some(draft) = &outcome.draft {
            println!();
            println!("📝 Draft for the prospect:");
            println!("{draft}");
        }
        if let Some(classification) = &outcome.classification {
            println!("🏷️  Classified as {}", classification.category);
        }
        if outcome.used_fallback {
            println!("⚠️  The model was unavailable, a fallback was used");
        }
    }
    if let Some(reason) = &reply.rejection {
        println!("🚫 Action rejected: {reason}");
    }
}

fn print_status(orchestrator: &ChatOrchestrator) {
    let session = orchestrator.session();
    let capabilities = session.capabilities();
    println!();
    println!("🔄 Phase: {}", session.phase());
    if capabilities.allowed_actions.is_empty() {
        println!("🏁 No further actions for this prospect");
    } else {
        let names: Vec<&str> = capabilities.allowed_actions.iter().map(|a| a.name()).collect();
        println!("🧰 Available actions: {}", names.join(", "));
    }
}

fn print_usage(ledger: &UsageLedger) {
    let summary = ledger.summary();
    println!();
    println!("📊 API usage");
    println!("   Calls: {}", summary.calls);
    println!(
        "   Tokens: {} prompt / {} completion",
        summary.prompt_tokens, summary.completion_tokens
    );
    for (purpose, totals) in &summary.by_purpose {
        println!(
            "   {:?}: {} calls, {} tokens, ${:.6}",
            purpose, totals.calls, totals.total_tokens, totals.cost
        );
    }
    println!("   Total cost: {}", summary.formatted_cost());
}
