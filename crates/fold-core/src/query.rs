//! Structural query interface.
//!
//! `fold-core` never parses text. A structural engine (for example the tree-sitter engine in
//! `fold-core-treesitter`) exposes its parse as a list of language layers and answers named
//! queries over row ranges with [`QueryMatch`] values.

use crate::range::Position;
use std::collections::BTreeMap;
use std::ops::Range;

/// A span reported by a structural engine. `end` may precede `start` if the engine is buggy;
/// consumers validate spans before turning them into ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpan {
    /// Start position.
    pub start: Position,
    /// End position (exclusive column on the end line).
    pub end: Position,
}

impl NodeSpan {
    /// Create a span.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// One capture inside a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCapture {
    /// Capture name without the leading `@`.
    pub name: String,
    /// The captured node's span.
    pub span: NodeSpan,
}

/// One query match: its captures plus arbitrary metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryMatch {
    /// Captures in match order.
    pub captures: Vec<QueryCapture>,
    /// Key/value properties attached to the match (render hints, priority, kind, ...).
    pub metadata: BTreeMap<String, String>,
    /// An explicit range computed by the engine for this match, if any.
    pub range: Option<NodeSpan>,
}

impl QueryMatch {
    /// Create an empty match.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capture.
    pub fn with_capture(mut self, name: impl Into<String>, span: NodeSpan) -> Self {
        self.captures.push(QueryCapture {
            name: name.into(),
            span,
        });
        self
    }

    /// Add a metadata property.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach an explicit range.
    pub fn with_range(mut self, span: NodeSpan) -> Self {
        self.range = Some(span);
        self
    }

    /// Metadata lookup.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// A language sub-tree of a (possibly multi-language) buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageLayer {
    /// Language name.
    pub language: String,
    /// First row covered by the layer's root.
    pub start_row: usize,
    /// Last row covered by the layer's root (inclusive).
    pub end_row: usize,
}

impl LanguageLayer {
    /// Create a layer.
    pub fn new(language: impl Into<String>, start_row: usize, end_row: usize) -> Self {
        Self {
            language: language.into(),
            start_row,
            end_row,
        }
    }

    /// Rows a query over this layer must cover (end made exclusive).
    pub fn query_rows(&self) -> Range<usize> {
        self.start_row..self.end_row.saturating_add(1)
    }
}

/// A structural engine that can answer named queries.
pub trait StructuralQuery {
    /// Identifier recorded as the buffer's fold provider.
    fn provider_id(&self) -> &str {
        "structural"
    }

    /// Language layers of the current parse, primary layer first.
    fn layers(&self) -> Vec<LanguageLayer>;

    /// Returns `true` if `language` has a query named `query_name`.
    fn has_query(&self, language: &str, query_name: &str) -> bool;

    /// Run `query_name` over `layer`, restricted to `rows` (0-based, half-open).
    fn run_query(&self, layer: &LanguageLayer, query_name: &str, rows: Range<usize>)
    -> Vec<QueryMatch>;
}
