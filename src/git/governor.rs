//! Size-bounded retrieval of the staged diff.
//!
//! Small diffs are passed through verbatim. Diffs larger than the byte
//! budget are replaced by a summary: the changed file list, the `--stat`
//! block and, space permitting, an excerpt of the raw diff cut at a hunk
//! header or line boundary by [`truncate_diff_smart`].
//!
//! The summary layout is stable; downstream prompts rely on its section
//! headers.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::git::source::ChangeSetSource;

/// Default byte budget used when a caller passes a zero budget.
pub const DEFAULT_MAX_DIFF_SIZE: usize = 32 * 1024;

/// Bytes kept free after the summary header for the excerpt framing.
///
/// A summarized [`DiffOutcome`] never exceeds its budget by more than this
/// amount.
pub const SUMMARY_RESERVE: usize = 200;

/// The file list and the stat block may each take up to
/// `max_bytes / SECTION_SHARE_DIVISOR` of the summary.
const SECTION_SHARE_DIVISOR: usize = 4;

/// A hunk boundary only wins over the newline fallback when it lies past
/// `max_len / HUNK_MIDPOINT_DIVISOR`.
const HUNK_MIDPOINT_DIVISOR: usize = 2;

/// Marker for a hunk header at the start of a line.
const HUNK_BOUNDARY: &str = "\n@@";

const STAT_PLACEHOLDER: &str = "(unable to get diff stat)";
const FILES_PLACEHOLDER: &str = "(unable to get file list)";

const SUMMARY_HEADER: &str = "=== DIFF SUMMARY (original too large) ===\n\n";
const CHANGED_FILES_HEADER: &str = "=== CHANGED FILES ===\n";
const DIFF_STAT_HEADER: &str = "=== DIFF STAT ===\n";
const EXCERPT_HEADER: &str = "=== TRUNCATED DIFF ===\n";
const EXCERPT_FOOTER: &str = "\n\n... [truncated] ...\n";
const STAT_ELLIPSIS: &str = "\n ...\n";

/// Result of a bounded diff fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Either the verbatim diff or the generated summary.
    pub content: String,
    /// Whether the budget was exceeded and a summary substituted.
    pub was_summarized: bool,
    /// Byte length of the untruncated diff.
    pub original_size: usize,
}

/// Decides whether a diff is small enough to send verbatim.
pub struct DiffGovernor<S> {
    source: S,
}

impl<S: ChangeSetSource> DiffGovernor<S> {
    /// Creates a governor over `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetches the diff, summarizing it when it exceeds `max_bytes`.
    ///
    /// A zero budget selects [`DEFAULT_MAX_DIFF_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns an error if the raw diff cannot be retrieved. Failures to
    /// fetch statistics or the file list only degrade the summary.
    pub fn get_bounded(&self, max_bytes: usize) -> Result<DiffOutcome> {
        let max_bytes = if max_bytes == 0 {
            DEFAULT_MAX_DIFF_SIZE
        } else {
            max_bytes
        };

        let diff = self
            .source
            .raw_diff()
            .context("Failed to get staged diff")?;
        let original_size = diff.len();

        if original_size <= max_bytes {
            debug!(original_size, max_bytes, "Diff fits within budget");
            return Ok(DiffOutcome {
                content: diff,
                was_summarized: false,
                original_size,
            });
        }

        let content = self.summarize(&diff, max_bytes);
        debug!(
            original_size,
            max_bytes,
            summary_size = content.len(),
            "Diff exceeded budget, summarized"
        );

        Ok(DiffOutcome {
            content,
            was_summarized: true,
            original_size,
        })
    }

    /// Builds the condensed replacement for an oversized diff.
    fn summarize(&self, diff: &str, max_bytes: usize) -> String {
        let stat = self.source.diff_statistics().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to get diff stat for summary");
            STAT_PLACEHOLDER.to_string()
        });

        let files = self.source.changed_files().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to get changed files for summary");
            vec![FILES_PLACEHOLDER.to_string()]
        });

        let mut summary = String::new();
        summary.push_str(SUMMARY_HEADER);
        summary.push_str(&format!("Original diff size: {} bytes\n", diff.len()));
        summary.push_str(&format!("Files changed: {}\n\n", files.len()));

        let section_cap = max_bytes / SECTION_SHARE_DIVISOR;

        summary.push_str(CHANGED_FILES_HEADER);
        push_file_list(&mut summary, &files, section_cap);
        summary.push('\n');

        summary.push_str(DIFF_STAT_HEADER);
        push_capped_stat(&mut summary, &stat, section_cap);
        summary.push('\n');

        let remaining = max_bytes
            .checked_sub(summary.len())
            .and_then(|space| space.checked_sub(SUMMARY_RESERVE))
            .unwrap_or(0);

        if remaining > 0 {
            summary.push_str(EXCERPT_HEADER);
            summary.push_str(truncate_diff_smart(diff, remaining));
            summary.push_str(EXCERPT_FOOTER);
        } else {
            debug!(
                header_size = summary.len(),
                "No room for a diff excerpt in summary"
            );
        }

        summary
    }
}

/// Lists files until `cap` bytes are used, then counts the rest.
fn push_file_list(summary: &mut String, files: &[String], cap: usize) {
    let mut used = 0;
    for (listed, file) in files.iter().enumerate() {
        let line = format!("  - {file}\n");
        if used + line.len() > cap {
            let omitted = files.len() - listed;
            debug!(listed, omitted, "File list capped in summary");
            summary.push_str(&format!("  ... and {omitted} more\n"));
            return;
        }
        used += line.len();
        summary.push_str(&line);
    }
}

/// Appends the stat block, cut to about `cap` bytes.
///
/// When cut, the final totals line is kept if it fits in half the cap.
fn push_capped_stat(summary: &mut String, stat: &str, cap: usize) {
    if stat.len() <= cap {
        summary.push_str(stat);
        return;
    }

    let totals = stat.trim_end().rsplit('\n').next().unwrap_or_default();
    if totals.len() + STAT_ELLIPSIS.len() <= cap / 2 {
        let head_len = cap - totals.len() - STAT_ELLIPSIS.len();
        summary.push_str(truncate_diff_smart(stat, head_len));
        summary.push_str(STAT_ELLIPSIS);
        summary.push_str(totals);
        summary.push('\n');
    } else {
        summary.push_str(truncate_diff_smart(stat, cap));
        summary.push_str(STAT_ELLIPSIS);
    }
}

/// Truncates `diff` to at most `max_len` bytes at a sensible boundary.
///
/// Prefers to end right after the last hunk header (`@@ ... @@` line) in the
/// slice when that header starts past the slice midpoint; otherwise cuts at
/// the last newline. The returned text never includes the trailing newline
/// of its final line. Text with no usable newline is returned as the raw
/// slice, backed off to a UTF-8 character boundary.
pub fn truncate_diff_smart(diff: &str, max_len: usize) -> &str {
    if diff.len() <= max_len {
        return diff;
    }

    let mut end = max_len;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &diff[..end];

    if let Some(last_hunk) = truncated.rfind(HUNK_BOUNDARY) {
        if last_hunk > max_len / HUNK_MIDPOINT_DIVISOR {
            let header_start = last_hunk + 1;
            if let Some(header_len) = truncated[header_start..].find('\n') {
                return &truncated[..header_start + header_len];
            }
            // Header line is cut off by the limit; drop it with the newline fallback.
        }
    }

    match truncated.rfind('\n') {
        Some(last_newline) if last_newline > 0 => &truncated[..last_newline],
        _ => truncated,
    }
}
