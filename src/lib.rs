//! # commit-gen
//!
//! Generates git commit messages for staged changes by handing them to an
//! OpenCode backend.
//!
//! ## Features
//!
//! - Size-bounded diff retrieval that falls back to a structured summary
//! - Per-repository backend session reuse with a persisted TTL cache
//! - Server (HTTP) and run (subprocess) backend modes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use commit_gen::git::{DiffGovernor, GitRepository};
//!
//! let repo = GitRepository::open().unwrap();
//! let outcome = DiffGovernor::new(repo).get_bounded(0).unwrap();
//! println!("{} bytes, summarized: {}", outcome.original_size, outcome.was_summarized);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod generator;
pub mod git;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::cli::Cli;
pub use crate::config::Config;

/// The current version of commit-gen.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
