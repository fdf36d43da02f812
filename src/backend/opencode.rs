//! OpenCode HTTP server client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BackendClient, BackendSession, ModelRef};
use crate::backend::error::BackendError;

/// Session creation request body.
#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    title: &'a str,
}

/// One part of a message.
#[derive(Serialize, Deserialize)]
struct MessagePart {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default)]
    text: String,
}

/// Prompt request body.
#[derive(Serialize)]
struct PromptRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a ModelRef>,
    parts: Vec<MessagePart>,
}

/// Prompt response body.
#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    parts: Vec<MessagePart>,
}

/// Health endpoint response.
#[derive(Deserialize)]
struct HealthResponse {
    healthy: bool,
    #[serde(default)]
    version: String,
}

/// Client for a running `opencode serve` instance.
pub struct OpenCodeClient {
    /// HTTP client for API requests.
    client: Client,
    /// Base URL without trailing slash.
    base_url: String,
}

impl OpenCodeClient {
    /// Creates a client for the server at `host:port`.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        Self::with_base_url(format!("http://{host}:{port}"), timeout)
    }

    /// Creates a client for the server at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Queries `/global/health`; a non-200 status reports unhealthy.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/global/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), "OpenCode health check returned non-OK status");
            return Ok(false);
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponseFormat(e.to_string()))?;
        debug!(healthy = health.healthy, version = %health.version, "OpenCode health");

        Ok(health.healthy)
    }

    async fn post_create_session(&self, title: &str) -> Result<BackendSession> {
        let url = format!("{}/session", self.base_url);
        info!(url = %url, title = %title, "Creating OpenCode session");

        let response = self
            .client
            .post(&url)
            .json(&CreateSessionRequest { title })
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        if !matches!(response.status(), StatusCode::OK | StatusCode::CREATED) {
            return Err(request_failed(response).await.into());
        }

        let session: BackendSession = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponseFormat(e.to_string()))?;
        debug!(session_id = %session.id, "Created OpenCode session");

        Ok(session)
    }

    async fn post_message(
        &self,
        session_id: &str,
        prompt: &str,
        model: Option<&ModelRef>,
    ) -> Result<String> {
        let url = format!("{}/session/{session_id}/message", self.base_url);
        let request = PromptRequest {
            model,
            parts: vec![MessagePart {
                part_type: "text".to_string(),
                text: prompt.to_string(),
            }],
        };

        let model_name = model
            .map(ModelRef::qualified)
            .unwrap_or_else(|| "default".to_string());
        info!(
            url = %url,
            prompt_len = prompt.len(),
            model = %model_name,
            "Sending prompt to OpenCode"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(request_failed(response).await.into());
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponseFormat(e.to_string()))?;

        let text = message
            .parts
            .into_iter()
            .find(|part| part.part_type == "text")
            .map(|part| part.text)
            .ok_or(BackendError::NoTextResponse)?;
        debug!(response_len = text.len(), "Received OpenCode reply");

        Ok(text)
    }
}

/// Builds a [`BackendError::RequestFailed`] from an unsuccessful response.
async fn request_failed(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_else(|e| {
        debug!("Failed to read error response body: {e}");
        String::new()
    });
    BackendError::RequestFailed { status, body }
}

impl BackendClient for OpenCodeClient {
    fn create_session<'a>(
        &'a self,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BackendSession>> + Send + 'a>> {
        Box::pin(self.post_create_session(title))
    }

    fn send_prompt<'a>(
        &'a self,
        session_id: &'a str,
        prompt: &'a str,
        model: Option<&'a ModelRef>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.post_message(session_id, prompt, model))
    }

    fn check_health(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(self.health())
    }
}
