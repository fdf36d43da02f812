//! Git repository operations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{Diff, DiffFormat, DiffStatsFormat, ErrorCode, Repository};
use tracing::debug;

use crate::git::source::{ChangeSetSource, RepositoryIdentity};

/// Column width used when rendering `--stat` output.
const STAT_WIDTH: usize = 80;

/// Commit message file git reads when `commit` is run without `-m`.
const COMMIT_MESSAGE_FILE: &str = "COMMIT_EDITMSG";

/// Git repository wrapper
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open repository containing the current directory
    pub fn open() -> Result<Self> {
        let repo = Repository::discover(".").context("Not in a git repository")?;

        Ok(Self { repo })
    }

    /// Open repository at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path).context("Failed to open git repository")?;

        Ok(Self { repo })
    }

    /// Get the canonical working tree root
    pub fn root(&self) -> Result<PathBuf> {
        let workdir = self
            .repo
            .workdir()
            .context("Bare repositories have no working tree")?;

        std::fs::canonicalize(workdir)
            .with_context(|| format!("Failed to canonicalize {}", workdir.display()))
    }

    /// Get the repository directory name
    pub fn name(&self) -> Result<String> {
        let root = self.root()?;
        root.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("Repository root has no directory name")
    }

    /// Check whether anything is staged
    pub fn has_staged_changes(&self) -> Result<bool> {
        let diff = self.staged_diff()?;
        Ok(diff.deltas().next().is_some())
    }

    /// Path of the commit message file inside the git directory
    pub fn commit_message_path(&self) -> PathBuf {
        self.repo.path().join(COMMIT_MESSAGE_FILE)
    }

    /// Write `message` to `COMMIT_EDITMSG` for the next `git commit`
    pub fn write_commit_message(&self, message: &str) -> Result<PathBuf> {
        let path = self.commit_message_path();
        std::fs::write(&path, message)
            .with_context(|| format!("Failed to write commit message to {}", path.display()))?;

        debug!(path = %path.display(), "Wrote commit message");
        Ok(path)
    }

    /// Diff between HEAD (or the empty tree on an unborn branch) and the index
    fn staged_diff(&self) -> Result<Diff<'_>> {
        let head_tree = match self.repo.head() {
            Ok(head) => Some(head.peel_to_tree().context("Failed to peel HEAD to tree")?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e).context("Failed to get HEAD reference"),
        };

        self.repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)
            .context("Failed to diff HEAD against the index")
    }
}

impl ChangeSetSource for GitRepository {
    fn raw_diff(&self) -> Result<String> {
        let diff = self.staged_diff()?;
        let mut patch = Vec::new();

        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            // File and hunk headers carry their own text; only body lines need the origin.
            if let origin @ ('+' | '-' | ' ') = line.origin() {
                patch.push(origin as u8);
            }
            patch.extend_from_slice(line.content());
            true
        })
        .context("Failed to format staged diff")?;

        // Bytes that are not UTF-8 (e.g. Latin-1 sources) become U+FFFD.
        let diff_content = String::from_utf8_lossy(&patch).into_owned();
        debug!(
            patch_bytes = patch.len(),
            bytes = diff_content.len(),
            "Rendered staged diff"
        );
        Ok(diff_content)
    }

    fn diff_statistics(&self) -> Result<String> {
        let diff = self.staged_diff()?;
        let stats = diff.stats().context("Failed to get diff stats")?;
        let buf = stats
            .to_buf(DiffStatsFormat::FULL, STAT_WIDTH)
            .context("Failed to format diff stats")?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn changed_files(&self) -> Result<Vec<String>> {
        let diff = self.staged_diff()?;

        Ok(diff
            .deltas()
            .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
            .map(|path| path.to_string_lossy().into_owned())
            .collect())
    }
}

/// Repository identity discovered from a starting directory on every call.
///
/// Discovery is repeated per call so the identity follows the caller's
/// working directory; `git2::Repository` itself cannot be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct DiscoveredRepository {
    start: PathBuf,
}

impl DiscoveredRepository {
    /// Creates an identity resolved from `start`.
    pub fn new<P: Into<PathBuf>>(start: P) -> Self {
        Self {
            start: start.into(),
        }
    }

    /// Creates an identity resolved from the current directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }
}

impl RepositoryIdentity for DiscoveredRepository {
    fn absolute_path(&self) -> Result<String> {
        let repo = GitRepository::open_at(&self.start)
            .context("Not a git repository or failed to get root")?;
        let root = repo.root()?;
        Ok(root.to_string_lossy().into_owned())
    }
}
