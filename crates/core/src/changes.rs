//! Line-based change tracking for forks.
//!
//! Uses the `diffy` crate to compute a line-level edit script between two
//! versions of a code buffer. The result is a display artifact for pull
//! request review; it is never replayed to reconstruct state.

use diffy::Line;
use tracing::debug;

/// Stateless line-diff engine.
pub struct ChangeTracker;

impl ChangeTracker {
    /// Compute the edit script from `old` to `new` as a list of tagged lines.
    ///
    /// Removed lines appear as `- <line>` and added lines as `+ <line>`, in
    /// the order the diff emits them: within a replacement, removals come
    /// before additions at the same position. Unchanged lines are omitted.
    /// Diffing a string against itself yields an empty list.
    pub fn diff(old: &str, new: &str) -> Vec<String> {
        if old == new {
            return Vec::new();
        }

        let patch = diffy::create_patch(old, new);
        let mut changes = Vec::new();
        for hunk in patch.hunks() {
            for line in hunk.lines() {
                match line {
                    Line::Delete(text) => changes.push(format!("- {}", trim_line_ending(text))),
                    Line::Insert(text) => changes.push(format!("+ {}", trim_line_ending(text))),
                    Line::Context(_) => {}
                }
            }
        }

        debug!(count = changes.len(), "computed change list");
        changes
    }
}

/// Strip the trailing newline diffy keeps on each line slice.
fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
