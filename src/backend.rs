//! OpenCode backend clients.

pub mod error;
pub mod opencode;
pub mod runner;

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use error::BackendError;
pub use opencode::OpenCodeClient;
pub use runner::OpenCodeRunner;

/// A conversation held by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSession {
    /// Opaque session identifier.
    pub id: String,
    /// Human-readable session title.
    #[serde(default)]
    pub title: String,
}

/// Provider and model a prompt should be answered by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Provider identifier, e.g. `anthropic`.
    #[serde(rename = "providerID")]
    pub provider_id: String,
    /// Model identifier within the provider.
    #[serde(rename = "modelID")]
    pub model_id: String,
}

impl ModelRef {
    /// Returns the `provider/model` form used on the `opencode` command line.
    pub fn qualified(&self) -> String {
        format!("{}/{}", self.provider_id, self.model_id)
    }
}

/// Trait for session-oriented backend clients.
pub trait BackendClient: Send + Sync {
    /// Creates a new session with the given title.
    fn create_session<'a>(
        &'a self,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BackendSession>> + Send + 'a>>;

    /// Sends `prompt` to an existing session and returns the text reply.
    fn send_prompt<'a>(
        &'a self,
        session_id: &'a str,
        prompt: &'a str,
        model: Option<&'a ModelRef>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Reports whether the backend is reachable and healthy.
    fn check_health(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(async { Ok(true) })
    }
}
