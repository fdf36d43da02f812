//! Commit message generation command.

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use crate::config::{BackendMode, Config};
use crate::generator::{Backend, Generator};
use crate::git::GitRepository;

/// Generate command options.
#[derive(Parser, Default)]
pub struct GenerateCommand {
    /// Backend mode override (run or server).
    #[arg(long)]
    pub mode: Option<BackendMode>,

    /// Diff byte budget before the diff is summarized.
    #[arg(long)]
    pub max_diff_size: Option<i64>,

    /// Prints the message without writing it to COMMIT_EDITMSG.
    #[arg(long)]
    pub dry_run: bool,

    /// Prints the prompt instead of contacting OpenCode.
    #[arg(long)]
    pub print_prompt: bool,

    /// Skips checking that the OpenCode backend is available.
    #[arg(long)]
    pub ignore_backend_check: bool,
}

impl GenerateCommand {
    /// Executes the generate command.
    pub async fn execute(self, mut config: Config) -> Result<()> {
        if let Some(mode) = self.mode {
            config.opencode.mode = mode;
        }
        if let Some(size) = self.max_diff_size {
            config.git.max_diff_size = size;
        }

        let store = if config.opencode.mode == BackendMode::Server && config.cache.enabled {
            match super::open_session_store(&config) {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "Session cache unavailable, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        let backend = Backend::from_config(&config)?;
        let mut generator = Generator::new(config, ".", store, backend);
        if self.ignore_backend_check {
            generator = generator.skip_backend_check();
        }

        let prepared = generator.prepare()?;
        if prepared.outcome.was_summarized {
            eprintln!(
                "⚠️  Diff of {} bytes was summarized to {} bytes",
                prepared.outcome.original_size,
                prepared.outcome.content.len()
            );
        }

        if self.print_prompt {
            println!("{}", generator.build_prompt(&prepared));
            return Ok(());
        }

        let message = generator.generate_from(&prepared).await?;

        if self.dry_run {
            println!("{message}");
            return Ok(());
        }

        let path = GitRepository::open()?.write_commit_message(&message)?;
        println!("✅ Commit message written to {}:", path.display());
        println!("  {message}");
        Ok(())
    }
}
