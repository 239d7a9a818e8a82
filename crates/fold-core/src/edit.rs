//! Coarse, line-granular edit notifications.
//!
//! Hosts report buffer mutations as "rows `first..last` were replaced by a block that now spans
//! `first..last_updated`". This module defines that notification and the one splice routine that
//! applies it to any per-line table (cached text, folded-line markers, ...).

/// A line-block replacement, in 0-based rows.
///
/// Semantics:
/// - rows `first_line..last_line` of the old buffer were removed
/// - rows `first_line..last_line_updated` of the new buffer were inserted in their place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditNotification {
    /// First touched row (inclusive).
    pub first_line: usize,
    /// End of the old block (exclusive).
    pub last_line: usize,
    /// End of the new block (exclusive).
    pub last_line_updated: usize,
}

impl EditNotification {
    /// Create a notification.
    pub fn new(first_line: usize, last_line: usize, last_line_updated: usize) -> Self {
        Self {
            first_line,
            last_line,
            last_line_updated,
        }
    }

    /// Net change in line count.
    pub fn delta(&self) -> isize {
        self.last_line_updated as isize - self.last_line as isize
    }

    /// Returns `true` if the edit only rewrote rows in place.
    pub fn is_in_place(&self) -> bool {
        self.delta() == 0
    }

    /// Returns `true` if the edit removed rows without inserting any.
    pub fn is_pure_deletion(&self) -> bool {
        self.first_line == self.last_line_updated && self.last_line > self.first_line
    }

    /// Clamp the notification to a table of `len` rows.
    ///
    /// Rows beyond the table cannot be removed; the inserted block keeps its size.
    pub fn clamped(&self, len: usize) -> Self {
        let first_line = self.first_line.min(len);
        let last_line = self.last_line.clamp(first_line, len);
        let inserted = self.last_line_updated.saturating_sub(self.first_line);
        Self {
            first_line,
            last_line,
            last_line_updated: first_line + inserted,
        }
    }
}

/// Apply `edit` to a per-row table, marking rewritten or inserted rows as `None`.
///
/// - in-place edit: rows `first..last` become `None`
/// - pure deletion: rows `first..last` are removed and later rows shift up
/// - otherwise: rows `first..last` are replaced by `last_updated - first` empty rows
///
/// Returns the clamped notification that was actually applied.
pub fn apply_line_edit<T>(rows: &mut Vec<Option<T>>, edit: EditNotification) -> EditNotification {
    let edit = edit.clamped(rows.len());
    let EditNotification {
        first_line: first,
        last_line: last,
        last_line_updated: last_updated,
    } = edit;

    if edit.is_in_place() {
        for row in &mut rows[first..last] {
            *row = None;
        }
    } else if first == last_updated {
        rows.drain(first..last);
    } else {
        rows.splice(
            first..last,
            std::iter::repeat_with(|| None).take(last_updated - first),
        );
    }

    edit
}
