//! Host editor interfaces.
//!
//! `fold-core` does not own text storage or rendering. The host editor supplies buffer contents
//! through [`BufferHost`] and draws closed-fold markers through [`DecorationRenderer`].

use std::ops::Range;

/// Opaque host buffer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u64);

impl BufferId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Host classification of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferKind {
    /// A regular file-backed or scratch text buffer.
    #[default]
    Normal,
    /// A terminal emulator buffer.
    Terminal,
    /// A prompt/input buffer.
    Prompt,
    /// Any other host-special buffer (quickfix lists, help pages, ...).
    Special,
}

impl BufferKind {
    /// Returns `true` if folds are computed for this kind of buffer.
    pub fn is_foldable(self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Read access to host buffers.
pub trait BufferHost {
    /// Fetch rows `rows` (0-based, half-open) of a buffer, without line terminators.
    fn get_lines(&self, buffer: BufferId, rows: Range<usize>) -> Vec<String>;

    /// Number of lines in a buffer.
    fn line_count(&self, buffer: BufferId) -> usize;

    /// Classification of a buffer.
    fn buffer_kind(&self, buffer: BufferId) -> BufferKind;

    /// Language (filetype) of a buffer, if known.
    fn language(&self, buffer: BufferId) -> Option<String>;
}

/// Handle to a host-rendered decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecorationHandle(pub u64);

/// Rendering sink for closed-fold markers.
pub trait DecorationRenderer {
    /// Render a folded-line marker at `line` (1-based) covering `line..=end_line`.
    fn render_marker(
        &mut self,
        buffer: BufferId,
        line: usize,
        end_line: usize,
        text: &str,
        width: usize,
    ) -> DecorationHandle;

    /// Remove a previously rendered marker.
    fn release_marker(&mut self, handle: DecorationHandle);
}
