//! Commit message generation.
//!
//! Combines the bounded staged diff with a backend. In server mode the
//! backend session for the repository is reused through the
//! [`SessionStore`] while it is within its TTL.

pub mod prompts;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, OpenCodeClient, OpenCodeRunner};
use crate::cache::SessionStore;
use crate::config::{BackendMode, Config};
use crate::git::{DiffGovernor, DiffOutcome, GitRepository};

/// Title fallback when the repository name cannot be determined.
const FALLBACK_REPO_NAME: &str = "project";

/// Where prompts are sent.
pub enum Backend {
    /// Session-based server backend.
    Server(Box<dyn BackendClient>),
    /// One-shot subprocess backend.
    Run(OpenCodeRunner),
}

impl Backend {
    /// Builds the backend selected by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(match config.opencode.mode {
            BackendMode::Server => Backend::Server(Box::new(OpenCodeClient::new(
                &config.opencode.host,
                config.opencode.port,
                config.timeout(),
            )?)),
            BackendMode::Run => Backend::Run(OpenCodeRunner::new(config.timeout())),
        })
    }

    /// Verifies the backend can take prompts.
    ///
    /// Server mode queries the health endpoint; run mode looks for the
    /// `opencode` binary on `PATH`.
    pub async fn check_available(&self) -> Result<()> {
        match self {
            Backend::Server(client) => {
                let healthy = client
                    .check_health()
                    .await
                    .context("OpenCode server is not running")?;
                if !healthy {
                    anyhow::bail!("OpenCode server reported itself unhealthy");
                }
                debug!("OpenCode server is healthy");
            }
            Backend::Run(runner) => {
                let path = runner.check_available()?;
                debug!(path = %path.display(), "Found opencode binary");
            }
        }
        Ok(())
    }
}

/// Staged changes ready to be turned into a prompt.
#[derive(Debug, Clone)]
pub struct PreparedDiff {
    /// Bounded diff.
    pub outcome: DiffOutcome,
    /// Repository directory name, used for session titles.
    pub repo_name: String,
}

/// Generates commit messages for one repository.
pub struct Generator {
    config: Config,
    repo_path: PathBuf,
    store: Option<Arc<SessionStore>>,
    backend: Backend,
    check_backend: bool,
}

impl Generator {
    /// Creates a generator for the repository containing `repo_path`.
    ///
    /// `store` is consulted only in server mode; `None` disables reuse.
    pub fn new<P: Into<PathBuf>>(
        config: Config,
        repo_path: P,
        store: Option<Arc<SessionStore>>,
        backend: Backend,
    ) -> Self {
        Self {
            config,
            repo_path: repo_path.into(),
            store,
            backend,
            check_backend: true,
        }
    }

    /// Skips the backend availability check before generating.
    pub fn skip_backend_check(mut self) -> Self {
        self.check_backend = false;
        self
    }

    /// Reads the staged diff under the configured budget.
    pub fn prepare(&self) -> Result<PreparedDiff> {
        let repo = GitRepository::open_at(&self.repo_path)?;
        if !repo.has_staged_changes()? {
            anyhow::bail!("No staged changes found");
        }
        let repo_name = repo.name().unwrap_or_else(|e| {
            debug!(error = %e, "Falling back to generic repository name");
            FALLBACK_REPO_NAME.to_string()
        });

        let outcome = DiffGovernor::new(repo)
            .get_bounded(self.config.max_diff_bytes())
            .context("Failed to get git diff")?;

        if outcome.was_summarized {
            info!(
                original_size = outcome.original_size,
                summary_size = outcome.content.len(),
                "Large diff was summarized"
            );
        }

        Ok(PreparedDiff { outcome, repo_name })
    }

    /// Builds the prompt for a prepared diff.
    pub fn build_prompt(&self, prepared: &PreparedDiff) -> String {
        prompts::build_prompt(
            self.config.generation.style,
            &prepared.outcome.content,
            prepared.outcome.was_summarized,
        )
    }

    /// Generates a commit message for the staged changes.
    pub async fn generate(&self) -> Result<String> {
        let prepared = self.prepare()?;
        self.generate_from(&prepared).await
    }

    /// Generates a commit message for an already prepared diff.
    pub async fn generate_from(&self, prepared: &PreparedDiff) -> Result<String> {
        if prepared.outcome.content.trim().is_empty() {
            anyhow::bail!("No staged changes found");
        }

        if self.check_backend {
            self.backend
                .check_available()
                .await
                .context("OpenCode backend is not available")?;
        }

        let prompt = self.build_prompt(prepared);
        let model = self.config.model();

        let response = match &self.backend {
            Backend::Run(runner) => runner
                .generate(&prompt, model.as_ref())
                .await
                .context("Failed to generate commit message")?,
            Backend::Server(client) => {
                self.generate_with_server(client.as_ref(), &prompt, &prepared.repo_name)
                    .await?
            }
        };

        Ok(prompts::extract_commit_message(&response))
    }

    async fn generate_with_server(
        &self,
        client: &dyn BackendClient,
        prompt: &str,
        repo_name: &str,
    ) -> Result<String> {
        let model = self.config.model();
        let cached_id = self.cached_session_id();
        let session_id = match &cached_id {
            Some(id) => id.clone(),
            None => self.create_session(client, repo_name).await?,
        };
        self.touch_session(&session_id);

        match client.send_prompt(&session_id, prompt, model.as_ref()).await {
            Ok(response) => Ok(response),
            Err(e) if cached_id.is_some() => {
                // The server may have dropped the cached session; start over once.
                warn!(session_id = %session_id, error = %e, "Cached session failed, creating a new one");
                let session_id = self.create_session(client, repo_name).await?;
                self.touch_session(&session_id);
                client
                    .send_prompt(&session_id, prompt, model.as_ref())
                    .await
                    .context("Failed to generate commit message")
            }
            Err(e) => Err(e.context("Failed to generate commit message")),
        }
    }

    /// Returns the live cached session ID, treating cache errors as a miss.
    fn cached_session_id(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.get() {
            Ok(Some(session)) => {
                debug!(session_id = %session.session_id, "Reusing cached OpenCode session");
                Some(session.session_id)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read session cache");
                None
            }
        }
    }

    async fn create_session(&self, client: &dyn BackendClient, repo_name: &str) -> Result<String> {
        let session = client
            .create_session(&format!("commit-gen: {repo_name}"))
            .await
            .context("Failed to create OpenCode session")?;

        if let Some(store) = &self.store {
            if let Err(e) = store.set(&session.id) {
                warn!(error = %e, "Failed to cache session");
            }
        }

        Ok(session.id)
    }

    fn touch_session(&self, session_id: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.touch(session_id) {
                warn!(error = %e, "Failed to update session last-used time");
            }
        }
    }
}
