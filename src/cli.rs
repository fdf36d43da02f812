//! CLI interface for commit-gen.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::cache::SessionStore;
use crate::config::Config;
use crate::git::DiscoveredRepository;

pub mod cache;
pub mod config;
pub mod generate;
pub mod health;
pub mod init;

/// commit-gen: commit messages for staged changes.
#[derive(Parser)]
#[command(name = "commit-gen")]
#[command(about = "Generate commit messages for staged changes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a config file (defaults to ~/.config/commit-gen/config.yaml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute; defaults to `generate`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Main command categories.
#[derive(Subcommand)]
pub enum Commands {
    /// Generates a commit message for the staged changes.
    Generate(generate::GenerateCommand),
    /// Session cache management.
    Cache(cache::CacheCommand),
    /// Configuration information.
    Config(config::ConfigCommand),
    /// Checks whether the OpenCode backend is available.
    Health(health::HealthCommand),
    /// Creates a default config file.
    Init(init::InitCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::default_path()?,
        };

        match self.command {
            // Init must work even when an existing file does not parse.
            Some(Commands::Init(init_cmd)) => init_cmd.execute(&config_path),
            Some(Commands::Generate(generate_cmd)) => {
                generate_cmd.execute(load_config(&config_path)?).await
            }
            None => {
                generate::GenerateCommand::default()
                    .execute(load_config(&config_path)?)
                    .await
            }
            Some(Commands::Cache(cache_cmd)) => cache_cmd.execute(&load_config(&config_path)?),
            Some(Commands::Config(config_cmd)) => {
                config_cmd.execute(&load_config(&config_path)?, &config_path)
            }
            Some(Commands::Health(health_cmd)) => {
                health_cmd
                    .execute(&load_config(&config_path)?, &config_path)
                    .await
            }
        }
    }
}

/// Loads the configuration file at `path` and applies environment overrides.
fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load_from_path(path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

/// Opens the session store described by `config` for the current repository.
pub(crate) fn open_session_store(config: &Config) -> Result<Arc<SessionStore>> {
    let store = SessionStore::open(
        config.cache_dir()?,
        config.cache_ttl()?,
        Arc::new(DiscoveredRepository::current_dir()),
    )
    .context("Failed to open session cache")?;

    Ok(Arc::new(store))
}
