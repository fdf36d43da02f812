//! Configuration-related CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;

/// Configuration operations.
#[derive(Parser)]
pub struct ConfigCommand {
    /// Configuration subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

/// Configuration subcommands.
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Shows the effective configuration as YAML.
    Show,
    /// Prints the config file path in use.
    Path,
}

impl ConfigCommand {
    /// Executes the config command.
    pub fn execute(self, config: &Config, config_path: &Path) -> Result<()> {
        match self.command {
            ConfigSubcommands::Show => {
                let yaml =
                    serde_yaml::to_string(config).context("Failed to serialize configuration")?;
                print!("{yaml}");
            }
            ConfigSubcommands::Path => {
                println!("{}", config_path.display());
            }
        }
        Ok(())
    }
}
