//! One-shot `opencode run` subprocess backend.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use super::ModelRef;
use crate::backend::error::BackendError;

/// Default program invoked for run mode.
const OPENCODE_PROGRAM: &str = "opencode";

/// Runs prompts through the `opencode run` command.
#[derive(Debug, Clone)]
pub struct OpenCodeRunner {
    program: PathBuf,
    timeout: Duration,
}

impl OpenCodeRunner {
    /// Creates a runner for the `opencode` binary on `PATH`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_program(OPENCODE_PROGRAM, timeout)
    }

    /// Creates a runner for a specific program.
    pub fn with_program<P: Into<PathBuf>>(program: P, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Returns the location of the program on `PATH`.
    pub fn check_available(&self) -> Result<PathBuf> {
        if self.program.components().count() > 1 {
            return if self.program.is_file() {
                Ok(self.program.clone())
            } else {
                Err(BackendError::BinaryNotFound.into())
            };
        }

        let path = env::var_os("PATH").ok_or(BackendError::BinaryNotFound)?;
        env::split_paths(&path)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| BackendError::BinaryNotFound.into())
    }

    /// Builds the argument list for a prompt.
    fn args(prompt: &str, model: Option<&ModelRef>) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        if let Some(model) = model {
            args.push("--model".to_string());
            args.push(model.qualified());
        }
        args.push(prompt.to_string());
        args
    }

    /// Runs the prompt and returns trimmed standard output.
    pub async fn generate(&self, prompt: &str, model: Option<&ModelRef>) -> Result<String> {
        let args = Self::args(prompt, model);
        info!(
            program = %self.program.display(),
            prompt_len = prompt.len(),
            timeout_secs = self.timeout.as_secs(),
            "Running opencode"
        );

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))?
            .with_context(|| format!("Failed to spawn {}", self.program.display()))?;

        if !output.status.success() {
            return Err(BackendError::ProcessFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(response_len = stdout.len(), "opencode run finished");
        Ok(stdout)
    }
}
