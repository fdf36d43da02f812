//! Session cache CLI commands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;

/// Session cache operations.
#[derive(Parser)]
pub struct CacheCommand {
    /// Cache subcommand to execute.
    #[command(subcommand)]
    pub command: CacheSubcommands,
}

/// Cache subcommands.
#[derive(Subcommand)]
pub enum CacheSubcommands {
    /// Shows how many sessions are cached and still valid.
    Status,
    /// Removes all cached sessions.
    Clear,
}

impl CacheCommand {
    /// Executes the cache command.
    pub fn execute(self, config: &Config) -> Result<()> {
        let store = super::open_session_store(config)?;

        match self.command {
            CacheSubcommands::Status => {
                let status = store.status().context("Failed to get cache status")?;
                println!("Cache Status:");
                println!("  Total entries: {}", status.total);
                println!("  Valid entries: {}", status.valid);
                println!("  TTL: {}", config.cache.ttl);
                println!("  Location: {}", store.cache_dir().display());
            }
            CacheSubcommands::Clear => {
                store.clear().context("Failed to clear cache")?;
                println!("✅ Cache cleared successfully");
            }
        }
        Ok(())
    }
}
