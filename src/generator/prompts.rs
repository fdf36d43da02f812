//! Prompt text for commit message generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Commit message style requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStyle {
    /// `type(scope): description` per Conventional Commits.
    #[default]
    Conventional,
    /// A single imperative sentence.
    Imperative,
    /// Conventional header plus an optional body.
    Detailed,
}

impl FromStr for CommitStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "conventional" => Ok(CommitStyle::Conventional),
            "imperative" => Ok(CommitStyle::Imperative),
            "detailed" => Ok(CommitStyle::Detailed),
            other => anyhow::bail!(
                "Unknown commit style '{other}'. Expected conventional, imperative or detailed"
            ),
        }
    }
}

impl fmt::Display for CommitStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStyle::Conventional => write!(f, "conventional"),
            CommitStyle::Imperative => write!(f, "imperative"),
            CommitStyle::Detailed => write!(f, "detailed"),
        }
    }
}

impl CommitStyle {
    /// Returns the style instructions embedded in the prompt.
    pub fn guide(self) -> &'static str {
        match self {
            CommitStyle::Conventional => {
                "Follow the Conventional Commits style:\n\
                 - Format: type(scope): description\n\
                 - Types: feat, fix, docs, style, refactor, perf, test, chore\n\
                 - Keep the scope short and the description under 72 characters"
            }
            CommitStyle::Imperative => {
                "Follow the imperative mood style:\n\
                 - Start with a verb (Add, Remove, Fix, Update, ...)\n\
                 - Keep it under 72 characters"
            }
            CommitStyle::Detailed => {
                "Use a detailed style with scope:\n\
                 - Format: type(scope): description\n\
                 - Types: feat, fix, docs, style, refactor, perf, test, chore\n\
                 - Include a brief body if needed"
            }
        }
    }
}

const SUMMARIZED_NOTE: &str = "NOTE: The diff below has been summarized because the original \
was too large. Use the file list, diff stat and the partial diff to understand the changes.";

/// Builds the prompt for a staged diff.
pub fn build_prompt(style: CommitStyle, diff: &str, is_summarized: bool) -> String {
    let mut prompt = String::from(
        "You are a git commit message generator. Generate a concise, meaningful commit \
         message for the following code changes.\n\n",
    );
    prompt.push_str(style.guide());
    prompt.push_str("\n\n");
    if is_summarized {
        prompt.push_str(SUMMARIZED_NOTE);
        prompt.push_str("\n\n");
    }
    prompt.push_str(
        "Generate ONLY the commit message, nothing else. No explanation, no markdown \
         formatting.\n\nHere are the staged changes:\n\n",
    );
    prompt.push_str(diff);
    prompt
}

/// Extracts the commit message line from a raw model reply.
///
/// Strips surrounding code fences and keeps the first line.
pub fn extract_commit_message(response: &str) -> String {
    let mut response = response.trim();

    if response.starts_with("```") {
        response = response.split_once('\n').map_or("", |(_, rest)| rest);
    }
    if let Some(stripped) = response.trim_end().strip_suffix("```") {
        response = stripped;
    }

    response.lines().next().unwrap_or("").trim().to_string()
}
