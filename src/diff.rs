//! Line diffs between page snapshots.
//!
//! Diffs run over the *raw* content so the reader sees the markup context of
//! a change, even though change detection itself uses normalized text.

use std::fmt;

use similar::{ChangeTag, TextDiff};

/// Lines of unchanged context around each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Text used in place of a diff when there is no previous snapshot.
pub const NO_PREVIOUS_SNAPSHOT: &str = "First observation, no diff available.";

/// Result of comparing a previous snapshot with current content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDiff {
    /// No previous snapshot existed to compare against.
    NoPrevious,
    /// Line delta between the previous snapshot and the current content.
    Delta(LineDiff),
}

impl PageDiff {
    /// Compare `previous` (if any) with `current`.
    pub fn compute(previous: Option<&str>, current: &str) -> Self {
        match previous {
            None => PageDiff::NoPrevious,
            Some(previous) => PageDiff::Delta(diff_lines(previous, current)),
        }
    }

    pub fn is_first_observation(&self) -> bool {
        matches!(self, PageDiff::NoPrevious)
    }

    /// Render as text for summaries and notifications.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PageDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageDiff::NoPrevious => f.write_str(NO_PREVIOUS_SNAPSHOT),
            PageDiff::Delta(diff) => diff.fmt(f),
        }
    }
}

/// A contiguous region of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// First line of the hunk in the previous content (1-based).
    pub old_start: usize,
    pub old_count: usize,
    /// First line of the hunk in the current content (1-based).
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

/// Unified-style line diff.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineDiff {
    pub hunks: Vec<Hunk>,
}

impl LineDiff {
    /// True when the two inputs had identical lines.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn additions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| matches!(l, DiffLine::Added(_)))
            .count()
    }

    pub fn deletions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| matches!(l, DiffLine::Removed(_)))
            .count()
    }
}

impl fmt::Display for LineDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hunks.is_empty() {
            return f.write_str("(no line changes)");
        }
        for (i, hunk) in self.hunks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            )?;
            for line in &hunk.lines {
                match line {
                    DiffLine::Context(text) => write!(f, "\n {}", text)?,
                    DiffLine::Removed(text) => write!(f, "\n-{}", text)?,
                    DiffLine::Added(text) => write!(f, "\n+{}", text)?,
                }
            }
        }
        Ok(())
    }
}

/// Compute a line diff with [`CONTEXT_LINES`] of context.
pub fn diff_lines(old: &str, new: &str) -> LineDiff {
    if old == new {
        return LineDiff::default();
    }

    let text_diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in text_diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        let mut lines = Vec::new();
        for op in &group {
            for change in text_diff.iter_changes(op) {
                let text = change
                    .value()
                    .trim_end_matches('\n')
                    .trim_end_matches('\r')
                    .to_string();
                lines.push(match change.tag() {
                    ChangeTag::Equal => DiffLine::Context(text),
                    ChangeTag::Delete => DiffLine::Removed(text),
                    ChangeTag::Insert => DiffLine::Added(text),
                });
            }
        }

        hunks.push(Hunk {
            old_start: hunk_start(&old_range),
            old_count: old_range.len(),
            new_start: hunk_start(&new_range),
            new_count: new_range.len(),
            lines,
        });
    }

    LineDiff { hunks }
}

/// Unified diff convention: an empty range reports the line before it.
fn hunk_start(range: &std::ops::Range<usize>) -> usize {
    if range.is_empty() {
        range.start
    } else {
        range.start + 1
    }
}
