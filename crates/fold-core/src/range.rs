//! Fold range values.

use crate::error::{FoldError, FoldResult};

/// A 0-based `(line, column)` position. Columns are byte offsets.
///
/// Ordering is lexicographic: line first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// 0-based line.
    pub line: usize,
    /// 0-based byte column.
    pub column: usize,
}

impl Position {
    /// Create a position.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Column used by [`Position::line_end`]. It is a sentinel, not a byte offset: do not do
    /// arithmetic on it, check [`Position::is_line_end`] first.
    pub const LINE_END_COLUMN: usize = usize::MAX;

    /// A position past every column of `line`.
    pub const fn line_end(line: usize) -> Self {
        Self {
            line,
            column: Self::LINE_END_COLUMN,
        }
    }

    /// Returns `true` if this position stands for the end of its line rather than a real column.
    pub const fn is_line_end(&self) -> bool {
        self.column == Self::LINE_END_COLUMN
    }
}

/// Coarse fold category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FoldKind {
    /// A comment block.
    Comment,
    /// A run of import statements.
    Imports,
    /// An explicit region marker.
    Region,
    /// Any other structural fold.
    #[default]
    Other,
}

impl FoldKind {
    /// Parse a `kind` property value. Unknown names map to [`FoldKind::Other`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "comment" => Self::Comment,
            "imports" => Self::Imports,
            "region" => Self::Region,
            _ => Self::Other,
        }
    }
}

/// Optional text and highlight hints for rendering a closed fold.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderMetadata {
    /// Text shown after the first folded line.
    pub start_text: Option<String>,
    /// Highlight group for `start_text`.
    pub start_highlight: Option<String>,
    /// Text shown in place of the last folded line.
    pub end_text: Option<String>,
    /// Highlight group for `end_text`.
    pub end_highlight: Option<String>,
}

impl RenderMetadata {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.start_text.is_none()
            && self.start_highlight.is_none()
            && self.end_text.is_none()
            && self.end_highlight.is_none()
    }
}

/// A folding range.
///
/// Ranges are plain values; a rescan produces a new set rather than mutating an old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldRange {
    /// Start position (inclusive).
    pub start: Position,
    /// End position.
    ///
    /// Ranges built with [`FoldRange::lines`] or shortened by [`FoldRange::trimmed`] end at
    /// [`Position::line_end`], whose column is the [`Position::LINE_END_COLUMN`] sentinel.
    pub end: Position,
    /// Fold category.
    pub kind: FoldKind,
    /// Priority hint carried from the query.
    pub priority: i32,
    /// Optional render hints.
    pub render: Option<RenderMetadata>,
}

impl FoldRange {
    /// Create a range, rejecting `end < start`.
    pub fn new(start: Position, end: Position) -> FoldResult<Self> {
        if end < start {
            return Err(FoldError::MalformedRange { start, end });
        }
        Ok(Self {
            start,
            end,
            kind: FoldKind::Other,
            priority: 0,
            render: None,
        })
    }

    /// Create a line-only range (`start_line..=end_line`, columns spanning whole lines).
    pub fn lines(start_line: usize, end_line: usize) -> FoldResult<Self> {
        Self::new(Position::new(start_line, 0), Position::line_end(end_line))
    }

    /// Set the fold kind.
    pub fn with_kind(mut self, kind: FoldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach render hints. Empty metadata is dropped.
    pub fn with_render(mut self, render: RenderMetadata) -> Self {
        self.render = (!render.is_empty()).then_some(render);
        self
    }

    /// 0-based start line.
    pub fn start_line(&self) -> usize {
        self.start.line
    }

    /// 0-based end line (inclusive).
    pub fn end_line(&self) -> usize {
        self.end.line
    }

    /// `(start_line, end_line)` grouping key.
    pub fn line_pair(&self) -> (usize, usize) {
        (self.start.line, self.end.line)
    }

    /// Returns `true` if `line` (0-based) lies within `start_line..=end_line`.
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start.line && line <= self.end.line
    }

    /// Returns `true` if `self` encloses `other` by full `(line, column)` span.
    pub fn includes(&self, other: &FoldRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns `true` if both ranges cover exactly the same positions.
    pub fn same_span(&self, other: &FoldRange) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Drop a trailing line the range only touches at column 0.
    ///
    /// Returns `None` when what is left spans a single line.
    pub fn trimmed(mut self) -> Option<Self> {
        if self.end.column == 0 {
            let line = self.end.line.checked_sub(1)?;
            self.end = Position::line_end(line);
        }
        (self.end.line > self.start.line).then_some(self)
    }
}
