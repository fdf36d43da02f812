//! Shared test doubles for collaborator traits.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::backend::{BackendClient, BackendSession, ModelRef};
use crate::git::source::{ChangeSetSource, RepositoryIdentity};

/// Change-set source backed by fixed strings.
///
/// `None` for the statistics or file list makes the corresponding call fail,
/// which is how tests exercise the degraded summary path.
pub(crate) struct StaticChangeSet {
    pub diff: Option<String>,
    pub stat: Option<String>,
    pub files: Option<Vec<String>>,
}

impl StaticChangeSet {
    pub(crate) fn new(diff: impl Into<String>) -> Self {
        Self {
            diff: Some(diff.into()),
            stat: Some(" a.rs | 1 +\n 1 file changed, 1 insertion(+)\n".to_string()),
            files: Some(vec!["a.rs".to_string()]),
        }
    }
}

impl ChangeSetSource for StaticChangeSet {
    fn raw_diff(&self) -> Result<String> {
        self.diff
            .clone()
            .ok_or_else(|| anyhow::anyhow!("not a git repository"))
    }

    fn diff_statistics(&self) -> Result<String> {
        self.stat
            .clone()
            .ok_or_else(|| anyhow::anyhow!("stat unavailable"))
    }

    fn changed_files(&self) -> Result<Vec<String>> {
        self.files
            .clone()
            .ok_or_else(|| anyhow::anyhow!("file list unavailable"))
    }
}

/// Identity that reports a path which can be swapped between calls.
#[derive(Clone)]
pub(crate) struct FixedIdentity {
    path: Arc<Mutex<Option<String>>>,
}

impl FixedIdentity {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            path: Arc::new(Mutex::new(Some(path.to_string()))),
        }
    }

    /// An identity whose resolution always fails.
    pub(crate) fn unresolvable() -> Self {
        Self {
            path: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn switch_to(&self, path: &str) {
        *self.path.lock().unwrap() = Some(path.to_string());
    }
}

impl RepositoryIdentity for FixedIdentity {
    fn absolute_path(&self) -> Result<String> {
        self.path
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("not a git repository"))
    }
}

/// Backend that records calls and replies from fixed queues.
#[derive(Clone, Default)]
pub(crate) struct RecordingBackend {
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Default)]
struct RecordingState {
    created_titles: Vec<String>,
    prompts: Vec<(String, String)>,
    next_session: usize,
    failing_sessions: Vec<String>,
    reply: String,
    unhealthy: bool,
}

impl RecordingBackend {
    pub(crate) fn replying(reply: &str) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().reply = reply.to_string();
        backend
    }

    /// Makes every prompt sent to `session_id` fail.
    pub(crate) fn fail_session(&self, session_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_sessions
            .push(session_id.to_string());
    }

    /// Makes the health check report an unhealthy server.
    pub(crate) fn mark_unhealthy(&self) {
        self.state.lock().unwrap().unhealthy = true;
    }

    pub(crate) fn created_titles(&self) -> Vec<String> {
        self.state.lock().unwrap().created_titles.clone()
    }

    /// Recorded `(session_id, prompt)` pairs.
    pub(crate) fn prompts(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().prompts.clone()
    }
}

impl BackendClient for RecordingBackend {
    fn create_session<'a>(
        &'a self,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BackendSession>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.next_session += 1;
            state.created_titles.push(title.to_string());
            Ok(BackendSession {
                id: format!("ses_{}", state.next_session),
                title: title.to_string(),
            })
        })
    }

    fn send_prompt<'a>(
        &'a self,
        session_id: &'a str,
        prompt: &'a str,
        _model: Option<&'a ModelRef>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state
                .prompts
                .push((session_id.to_string(), prompt.to_string()));
            if state.failing_sessions.iter().any(|s| s == session_id) {
                anyhow::bail!("session {session_id} not found");
            }
            Ok(state.reply.clone())
        })
    }

    fn check_health(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(async move { Ok(!self.state.lock().unwrap().unhealthy) })
    }
}
