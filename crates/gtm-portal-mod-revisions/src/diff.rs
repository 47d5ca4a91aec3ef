/// Coarse line-set diff between two revisions.
use std::collections::HashSet;

use serde::Serialize;

/// Result of comparing two revisions of an item.
///
/// Lines are compared by set membership, not position: a line counts as
/// added when it appears in the newer content but nowhere in the older one.
/// Duplicates are not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevisionDiff {
    /// `added` followed by `removed`.
    pub changed: Vec<String>,
    /// Lines of the second revision absent from the first.
    pub added: Vec<String>,
    /// Lines of the first revision absent from the second.
    pub removed: Vec<String>,
    /// False when either version does not exist. All lists are then empty.
    pub found: bool,
}

impl RevisionDiff {
    /// The result reported when either side of the comparison is missing.
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Diffs `old` against `new`, splitting both on `\n`.
    pub fn between(old: &str, new: &str) -> Self {
        let old_lines: Vec<&str> = old.split('\n').collect();
        let new_lines: Vec<&str> = new.split('\n').collect();
        let old_set: HashSet<&str> = old_lines.iter().copied().collect();
        let new_set: HashSet<&str> = new_lines.iter().copied().collect();

        let added: Vec<String> = new_lines
            .iter()
            .filter(|line| !old_set.contains(*line))
            .map(|line| (*line).to_string())
            .collect();
        let removed: Vec<String> = old_lines
            .iter()
            .filter(|line| !new_set.contains(*line))
            .map(|line| (*line).to_string())
            .collect();
        let changed = added.iter().chain(removed.iter()).cloned().collect();

        Self {
            changed,
            added,
            removed,
            found: true,
        }
    }

    /// True when both revisions exist and no line differs.
    pub fn is_unchanged(&self) -> bool {
        self.found && self.changed.is_empty()
    }
}
