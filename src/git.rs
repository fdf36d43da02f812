//! Git operations and staged diff retrieval.

pub mod governor;
pub mod repository;
pub mod source;

pub use governor::{truncate_diff_smart, DiffGovernor, DiffOutcome, DEFAULT_MAX_DIFF_SIZE};
pub use repository::{DiscoveredRepository, GitRepository};
pub use source::{ChangeSetSource, RepositoryIdentity};
