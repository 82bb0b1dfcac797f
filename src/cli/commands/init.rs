use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::cli::commands::Command;
use crate::config::{OutreachConfig, DEFAULT_CONFIG_FILE};

/// Writes a default configuration file. Existing files are only replaced with `--force`.
pub struct InitCommand {
    pub path: PathBuf,
    pub force: bool,
    pub dry_run: bool,
}

impl InitCommand {
    pub fn new(force: bool, dry_run: bool) -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            force,
            dry_run,
        }
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }
}

impl Command for InitCommand {
    async fn execute(&self) -> Result<()> {
        if self.dry_run {
            println!("🚀 OUTREACH INIT (DRY RUN)");
        } else {
            println!("🚀 OUTREACH INIT");
        }
        println!("================");
        println!();

        if self.path.exists() && !self.force {
            return Err(anyhow!(
                "Configuration file {} already exists. Use --force to overwrite.",
                self.path.display()
            ));
        }

        let config = OutreachConfig::default();
        if self.dry_run {
            println!("Would create configuration file: {}", self.path.display());
            println!();
            println!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }

        print!("⚙️  Writing {}... ", self.path.display());
        std::io::Write::flush(&mut std::io::stdout())?;
        config.save_to_file(&self.path)?;
        println!("✅");
        println!();
        println!("💡 Set OPENAI_API_KEY (or llm.api_key) and run 'outreach chat' to start.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outreach.toml");

        InitCommand::new(false, false).with_path(&path).execute().await.unwrap();

        let loaded = OutreachConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.funnel.max_follow_up_attempts, 1);
        assert_eq!(loaded.llm.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outreach.toml");
        std::fs::write(&path, "[funnel]\nmax_follow_up_attempts = 3\n").unwrap();

        let err = InitCommand::new(false, false).with_path(&path).execute().await.unwrap_err();
        assert!(err.to_string().contains("--force"));

        InitCommand::new(true, false).with_path(&path).execute().await.unwrap();
        assert_eq!(OutreachConfig::load(Some(&path)).unwrap().funnel.max_follow_up_attempts, 1);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outreach.toml");

        InitCommand::new(false, true).with_path(&path).execute().await.unwrap();
        assert!(!path.exists());
    }
}
