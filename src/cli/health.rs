//! Backend availability check.

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use crate::config::Config;
use crate::generator::Backend;

/// Health command options.
#[derive(Parser)]
pub struct HealthCommand {}

impl HealthCommand {
    /// Prints version and configuration, then checks the configured backend.
    pub async fn execute(self, config: &Config, config_path: &Path) -> Result<()> {
        println!("commit-gen:");
        println!("  Version: {}", crate::VERSION);

        println!("Configuration file:");
        println!("  Location: {}", config_path.display());
        println!("  Exists: {}", config_path.exists());

        println!("Configuration:");
        println!("  Mode: {}", config.opencode.mode);
        println!("  Host: {}", config.opencode.host);
        println!("  Port: {}", config.opencode.port);
        println!("  Timeout: {}s", config.opencode.timeout);
        println!("  Cache: {}", config.cache.enabled);
        println!("  Max Diff Size: {} bytes", config.git.max_diff_size);

        println!("OpenCode backend ({} mode):", config.opencode.mode);
        match Backend::from_config(config)?.check_available().await {
            Ok(()) => {
                println!("✅ OpenCode backend is available");
                Ok(())
            }
            Err(e) => {
                println!("❌ OpenCode backend is not available");
                Err(e)
            }
        }
    }
}
