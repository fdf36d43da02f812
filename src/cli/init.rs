//! Config file initialization.

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use crate::config::Config;

/// Init command options.
#[derive(Parser)]
pub struct InitCommand {}

impl InitCommand {
    /// Writes a default config file at `config_path` unless one exists.
    pub fn execute(self, config_path: &Path) -> Result<()> {
        if !Config::init_file(config_path)? {
            println!(
                "⚠️  Configuration file already exists at: {}",
                config_path.display()
            );
            println!("Use 'commit-gen config show' to view current settings.");
            return Ok(());
        }

        println!("✅ Configuration file created successfully");
        println!("  Location: {}", config_path.display());
        Ok(())
    }
}
