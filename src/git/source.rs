//! Collaborator seams for change-set retrieval and repository identity.

use anyhow::Result;

/// Something that can describe the pending change-set of a repository.
pub trait ChangeSetSource {
    /// Returns the full unified diff of the pending changes.
    fn raw_diff(&self) -> Result<String>;

    /// Returns a short per-file statistics summary (`git diff --stat` style).
    fn diff_statistics(&self) -> Result<String>;

    /// Returns the repository-relative paths of all changed files.
    fn changed_files(&self) -> Result<Vec<String>>;

    /// Returns the total byte size of the unified diff.
    fn diff_size(&self) -> Result<usize> {
        Ok(self.raw_diff()?.len())
    }
}

/// Resolves the canonical absolute path of the current repository.
///
/// The path is only used to derive session cache keys, so implementations
/// must return the same string for the same repository across runs.
pub trait RepositoryIdentity: Send + Sync {
    /// Returns the absolute repository root path.
    fn absolute_path(&self) -> Result<String>;
}
