use fold_core::{
    BufferHost, BufferId, EditNotification, LanguageLayer, NodeSpan, Position, QueryCapture,
    QueryMatch, StructuralQuery,
};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use streaming_iterator::StreamingIterator;
use thiserror::Error;
use tree_sitter::{
    InputEdit, Language, Node, Parser, Point, Query, QueryCursor, QueryPredicateArg, Tree,
};

/// Errors produced while building a [`TreeSitterQueryEngine`].
#[derive(Debug, Error)]
pub enum TreeSitterError {
    #[error("tree-sitter language error for `{language}`: {message}")]
    /// Setting the Tree-sitter language failed.
    Language {
        /// Configured language name.
        language: String,
        /// Parser error message.
        message: String,
    },

    #[error("tree-sitter query error in `{language}/{query}`: {message}")]
    /// Compiling a Tree-sitter query failed.
    Query {
        /// Configured language name.
        language: String,
        /// Query name (`"folds"`, `"injections"`, ...).
        query: String,
        /// Compiler error message.
        message: String,
    },

    #[error("primary language `{0}` is not configured")]
    /// The primary language has no configuration entry.
    UnknownLanguage(String),
}

/// How the engine updated its parse tree for the last text change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSitterUpdateMode {
    /// First parse for this engine instance.
    Initial,
    /// Updated by editing the old tree from an [`EditNotification`] and re-parsing incrementally.
    Incremental,
    /// The notification did not match the text change; re-parsed from scratch.
    FullReparse,
    /// The text was unchanged; no work was performed.
    Skipped,
}

/// Queries and grammar for one language.
#[derive(Debug, Clone)]
pub struct TreeSitterLanguageConfig {
    /// Tree-sitter language.
    pub language: Language,
    /// Named queries (`.scm` sources), e.g. `"folds"`.
    pub queries: BTreeMap<String, String>,
    /// Optional injection query. Matches capture `@injection.content` and name the language with
    /// `@injection.language` or `(#set! injection.language "...")`.
    pub injections_query: Option<String>,
}

impl TreeSitterLanguageConfig {
    /// Create a config with no queries.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            queries: BTreeMap::new(),
            injections_query: None,
        }
    }

    /// Register a named query.
    pub fn with_query(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.queries.insert(name.into(), source.into());
        self
    }

    /// Register the `"folds"` query.
    pub fn with_folds_query(self, source: impl Into<String>) -> Self {
        self.with_query("folds", source)
    }

    /// A small fold query that works well for Rust-like curly-brace languages.
    pub fn with_default_rust_folds(self) -> Self {
        self.with_folds_query(
            r#"
            (function_item) @fold
            (impl_item) @fold
            (struct_item) @fold
            (enum_item) @fold
            (trait_item) @fold
            (mod_item) @fold
            ((block_comment) @fold (#set! kind "comment"))
            "#,
        )
    }

    /// Set the injection query.
    pub fn with_injections_query(mut self, source: impl Into<String>) -> Self {
        self.injections_query = Some(source.into());
        self
    }
}

/// Configuration for [`TreeSitterQueryEngine`].
#[derive(Debug, Clone)]
pub struct TreeSitterEngineConfig {
    /// Language of the buffer's root layer.
    pub primary: String,
    /// Every language the engine can parse, keyed by name.
    pub languages: BTreeMap<String, TreeSitterLanguageConfig>,
    /// `#make-range!` directives with this name become the match's explicit range; others
    /// become synthetic captures of the same name.
    pub range_name: String,
}

impl TreeSitterEngineConfig {
    /// Default `#make-range!` name.
    pub const DEFAULT_RANGE_NAME: &str = "fold";

    /// Create a config whose primary language is `primary`.
    pub fn new(primary: impl Into<String>, config: TreeSitterLanguageConfig) -> Self {
        let primary = primary.into();
        let mut languages = BTreeMap::new();
        languages.insert(primary.clone(), config);
        Self {
            primary,
            languages,
            range_name: Self::DEFAULT_RANGE_NAME.to_string(),
        }
    }

    /// Register an additional (injectable) language.
    pub fn with_language(
        mut self,
        name: impl Into<String>,
        config: TreeSitterLanguageConfig,
    ) -> Self {
        self.languages.insert(name.into(), config);
        self
    }

    /// Change the `#make-range!` name treated as the explicit range.
    pub fn with_range_name(mut self, name: impl Into<String>) -> Self {
        self.range_name = name.into();
        self
    }
}

struct CompiledLanguage {
    language: Language,
    queries: HashMap<String, Query>,
    injections: Option<Query>,
}

impl CompiledLanguage {
    fn compile(name: &str, config: &TreeSitterLanguageConfig) -> Result<Self, TreeSitterError> {
        let compile_one = |query: &str, source: &str| {
            Query::new(&config.language, source).map_err(|e| TreeSitterError::Query {
                language: name.to_string(),
                query: query.to_string(),
                message: e.to_string(),
            })
        };

        let mut queries = HashMap::new();
        for (query, source) in &config.queries {
            if source.trim().is_empty() {
                continue;
            }
            queries.insert(query.clone(), compile_one(query.as_str(), source.as_str())?);
        }

        let injections = match config.injections_query.as_deref() {
            Some(source) if !source.trim().is_empty() => Some(compile_one("injections", source)?),
            _ => None,
        };

        Ok(Self {
            language: config.language.clone(),
            queries,
            injections,
        })
    }
}

struct InjectedTree {
    layer: LanguageLayer,
    tree: Tree,
}

/// A [`StructuralQuery`] backed by Tree-sitter parse trees.
///
/// The engine owns a copy of the buffer text. Feed it whole texts with
/// [`TreeSitterQueryEngine::set_text`], or line edits with [`TreeSitterQueryEngine::update`] to
/// re-parse incrementally. Injected languages are parsed into separate layers after every update.
pub struct TreeSitterQueryEngine {
    primary: String,
    range_name: String,
    languages: HashMap<String, CompiledLanguage>,
    parser: Parser,
    text: String,
    line_starts: Vec<usize>,
    tree: Option<Tree>,
    injected: Vec<InjectedTree>,
    last_update_mode: TreeSitterUpdateMode,
}

impl std::fmt::Debug for TreeSitterQueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSitterQueryEngine")
            .field("primary", &self.primary)
            .field("languages", &self.languages.keys().collect::<Vec<_>>())
            .field("text_len", &self.text.len())
            .field("injected_layers", &self.injected.len())
            .field("last_update_mode", &self.last_update_mode)
            .finish()
    }
}

impl TreeSitterQueryEngine {
    /// Compile every configured query and prepare a parser for the primary language.
    pub fn new(config: TreeSitterEngineConfig) -> Result<Self, TreeSitterError> {
        let mut languages = HashMap::new();
        for (name, language) in &config.languages {
            languages.insert(name.clone(), CompiledLanguage::compile(name, language)?);
        }

        let Some(primary) = languages.get(&config.primary) else {
            return Err(TreeSitterError::UnknownLanguage(config.primary));
        };
        let mut parser = Parser::new();
        parser
            .set_language(&primary.language)
            .map_err(|e| TreeSitterError::Language {
                language: config.primary.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            primary: config.primary,
            range_name: config.range_name,
            languages,
            parser,
            text: String::new(),
            line_starts: vec![0],
            tree: None,
            injected: Vec::new(),
            last_update_mode: TreeSitterUpdateMode::FullReparse,
        })
    }

    /// Get the last update mode (useful for tests and instrumentation).
    pub fn last_update_mode(&self) -> TreeSitterUpdateMode {
        self.last_update_mode
    }

    /// Text of the last parse.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse tree of the primary layer.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Replace the whole text and re-parse from scratch.
    pub fn set_text(&mut self, text: &str) -> TreeSitterUpdateMode {
        let mode = if self.tree.is_none() {
            TreeSitterUpdateMode::Initial
        } else if self.text == text {
            TreeSitterUpdateMode::Skipped
        } else {
            TreeSitterUpdateMode::FullReparse
        };
        if mode != TreeSitterUpdateMode::Skipped {
            self.replace_text(text);
            self.tree = None;
            self.reparse();
        }
        self.last_update_mode = mode;
        mode
    }

    /// Apply a line edit: `edit` describes how `new_text` differs from the current text.
    ///
    /// The old tree is edited and re-parsed incrementally. If the notification does not match
    /// the change, the engine falls back to a full re-parse.
    pub fn update(&mut self, edit: EditNotification, new_text: &str) -> TreeSitterUpdateMode {
        if self.tree.is_none() || self.text == new_text {
            return self.set_text(new_text);
        }

        let mode = match self.input_edit(edit, new_text) {
            Some(input) => {
                if let Some(tree) = self.tree.as_mut() {
                    tree.edit(&input);
                }
                TreeSitterUpdateMode::Incremental
            }
            None => {
                tracing::debug!(
                    first = edit.first_line,
                    last = edit.last_line,
                    last_updated = edit.last_line_updated,
                    "edit does not match text change, re-parsing from scratch"
                );
                self.tree = None;
                TreeSitterUpdateMode::FullReparse
            }
        };

        self.replace_text(new_text);
        self.reparse();
        self.last_update_mode = mode;
        mode
    }

    /// Load the full text of `buffer` from `host` and re-parse it.
    pub fn sync_host(&mut self, host: &dyn BufferHost, buffer: BufferId) -> TreeSitterUpdateMode {
        let text = host_text(host, buffer);
        self.set_text(&text)
    }

    /// Reload `buffer` from `host` after `edit` and re-parse incrementally.
    pub fn update_from_host(
        &mut self,
        host: &dyn BufferHost,
        buffer: BufferId,
        edit: EditNotification,
    ) -> TreeSitterUpdateMode {
        let text = host_text(host, buffer);
        self.update(edit, &text)
    }

    fn replace_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.line_starts = line_starts(&self.text);
    }

    fn input_edit(&self, edit: EditNotification, new_text: &str) -> Option<InputEdit> {
        let old = self.text.as_str();
        let old_count = self.line_starts.len();
        let new_starts = line_starts(new_text);

        if edit.first_line > edit.last_line
            || edit.first_line > edit.last_line_updated
            || edit.last_line > old_count
        {
            return None;
        }
        let expected = old_count - (edit.last_line - edit.first_line)
            + (edit.last_line_updated - edit.first_line);
        if expected != new_starts.len() {
            return None;
        }

        // Edits reaching the end of the buffer also take the newline before `first_line`.
        let at_end = edit.last_line == old_count;
        let start_byte = match self.line_starts.get(edit.first_line) {
            Some(&start) if at_end && edit.first_line > 0 => start.saturating_sub(1),
            Some(&start) => start,
            None => old.len(),
        };
        let (old_end_byte, new_end_byte) = if at_end {
            (old.len(), new_text.len())
        } else {
            (
                *self.line_starts.get(edit.last_line)?,
                *new_starts.get(edit.last_line_updated)?,
            )
        };

        if start_byte > old_end_byte || start_byte > new_end_byte {
            return None;
        }
        let (old_bytes, new_bytes) = (old.as_bytes(), new_text.as_bytes());
        if old_bytes.get(..start_byte)? != new_bytes.get(..start_byte)?
            || old_bytes.get(old_end_byte..)? != new_bytes.get(new_end_byte..)?
        {
            return None;
        }

        Some(InputEdit {
            start_byte,
            old_end_byte,
            new_end_byte,
            start_position: point_at(&self.line_starts, start_byte),
            old_end_position: point_at(&self.line_starts, old_end_byte),
            new_end_position: point_at(&new_starts, new_end_byte),
        })
    }

    fn reparse(&mut self) {
        self.injected.clear();
        let Some(primary) = self.languages.get(&self.primary) else {
            self.tree = None;
            return;
        };

        let configured = self.parser.set_language(&primary.language).is_ok()
            && self.parser.set_included_ranges(&[]).is_ok();
        if !configured {
            tracing::warn!(language = %self.primary, "failed to configure primary parser");
            self.tree = None;
            return;
        }
        self.tree = self.parser.parse(&self.text, self.tree.as_ref());

        let requests = match (self.tree.as_ref(), primary.injections.as_ref()) {
            (Some(tree), Some(query)) => {
                injection_requests(query, tree.root_node(), self.text.as_bytes())
            }
            _ => Vec::new(),
        };
        for (language, range) in requests {
            self.parse_injection(language, range);
        }
    }

    fn parse_injection(&mut self, language: String, range: tree_sitter::Range) {
        let Some(compiled) = self.languages.get(&language) else {
            tracing::trace!(%language, "skipping injection of unconfigured language");
            return;
        };
        if self.parser.set_language(&compiled.language).is_err()
            || self.parser.set_included_ranges(&[range]).is_err()
        {
            tracing::warn!(%language, "failed to configure injection parser");
            return;
        }
        let Some(tree) = self.parser.parse(&self.text, None) else {
            return;
        };
        let layer = LanguageLayer::new(language, range.start_point.row, range.end_point.row);
        self.injected.push(InjectedTree { layer, tree });
    }

    fn primary_layer(&self) -> Option<LanguageLayer> {
        let root = self.tree.as_ref()?.root_node();
        Some(LanguageLayer::new(
            self.primary.clone(),
            root.start_position().row,
            root.end_position().row,
        ))
    }

    fn tree_for(&self, layer: &LanguageLayer) -> Option<&Tree> {
        if self.primary_layer().as_ref() == Some(layer) {
            return self.tree.as_ref();
        }
        self.injected
            .iter()
            .find(|injected| injected.layer == *layer)
            .map(|injected| &injected.tree)
    }
}

impl StructuralQuery for TreeSitterQueryEngine {
    fn provider_id(&self) -> &str {
        "treesitter"
    }

    fn layers(&self) -> Vec<LanguageLayer> {
        self.primary_layer()
            .into_iter()
            .chain(self.injected.iter().map(|injected| injected.layer.clone()))
            .collect()
    }

    fn has_query(&self, language: &str, query_name: &str) -> bool {
        self.languages
            .get(language)
            .is_some_and(|l| l.queries.contains_key(query_name))
    }

    fn run_query(
        &self,
        layer: &LanguageLayer,
        query_name: &str,
        rows: Range<usize>,
    ) -> Vec<QueryMatch> {
        let Some(tree) = self.tree_for(layer) else {
            return Vec::new();
        };
        let Some(query) = self
            .languages
            .get(&layer.language)
            .and_then(|l| l.queries.get(query_name))
        else {
            return Vec::new();
        };

        let source = self.text.as_bytes();
        let names = query.capture_names();
        let mut cursor = QueryCursor::new();
        cursor.set_point_range(
            Point {
                row: rows.start,
                column: 0,
            }..Point {
                row: rows.end,
                column: 0,
            },
        );

        let mut out = Vec::new();
        let mut matches = cursor.matches(query, tree.root_node(), source);
        while let Some(m) = matches.next() {
            let mut found = QueryMatch::new();
            for capture in m.captures {
                let Some(name) = names.get(capture.index as usize) else {
                    continue;
                };
                found.captures.push(QueryCapture {
                    name: name.to_string(),
                    span: node_span(capture.node, capture.node),
                });
            }

            for property in query.property_settings(m.pattern_index) {
                let value = property.value.as_deref().unwrap_or_default();
                found.metadata.insert(property.key.to_string(), value.to_string());
            }

            for predicate in query.general_predicates(m.pattern_index) {
                if &*predicate.operator != "make-range!" {
                    continue;
                }
                let Some((name, span)) = make_range(&predicate.args, m.captures) else {
                    continue;
                };
                if name == self.range_name {
                    found.range = Some(span);
                } else {
                    found.captures.push(QueryCapture { name, span });
                }
            }

            out.push(found);
        }
        out
    }
}

fn host_text(host: &dyn BufferHost, buffer: BufferId) -> String {
    host.get_lines(buffer, 0..host.line_count(buffer)).join("\n")
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

fn point_at(line_starts: &[usize], byte: usize) -> Point {
    let row = line_starts.partition_point(|&start| start <= byte).saturating_sub(1);
    let start = line_starts.get(row).copied().unwrap_or(0);
    Point {
        row,
        column: byte - start,
    }
}

fn node_span(start: Node, end: Node) -> NodeSpan {
    let (s, e) = (start.start_position(), end.end_position());
    NodeSpan::new(Position::new(s.row, s.column), Position::new(e.row, e.column))
}

/// `(#make-range! "name" @start @end)`: from the start of the first `@start` node to the end of
/// the last `@end` node.
fn make_range(
    args: &[QueryPredicateArg],
    captures: &[tree_sitter::QueryCapture],
) -> Option<(String, NodeSpan)> {
    let [
        QueryPredicateArg::String(name),
        QueryPredicateArg::Capture(start),
        QueryPredicateArg::Capture(end),
    ] = args
    else {
        return None;
    };
    let start = captures.iter().find(|c| c.index == *start)?.node;
    let end = captures.iter().rev().find(|c| c.index == *end)?.node;
    Some((name.to_string(), node_span(start, end)))
}

fn injection_requests(
    query: &Query,
    root: Node,
    source: &[u8],
) -> Vec<(String, tree_sitter::Range)> {
    let Some(content) = query.capture_index_for_name("injection.content") else {
        return Vec::new();
    };
    let language_capture = query.capture_index_for_name("injection.language");

    let mut out = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source);
    while let Some(m) = matches.next() {
        let language = m
            .captures
            .iter()
            .find(|c| Some(c.index) == language_capture)
            .and_then(|c| c.node.utf8_text(source).ok())
            .map(str::to_string)
            .or_else(|| {
                query
                    .property_settings(m.pattern_index)
                    .iter()
                    .find(|p| &*p.key == "injection.language")
                    .and_then(|p| p.value.as_deref())
                    .map(str::to_string)
            });
        let Some(language) = language else {
            continue;
        };
        for capture in m.captures.iter().filter(|c| c.index == content) {
            out.push((language.clone(), capture.node.range()));
        }
    }
    out
}
