#![warn(missing_docs)]
//! `fold-core-treesitter` - Tree-sitter query engine for `fold-core`.
//!
//! [`TreeSitterQueryEngine`] implements [`fold_core::StructuralQuery`] on top of real Tree-sitter
//! grammars:
//!
//! - named queries per language (`"folds"` by default)
//! - `#set!` properties reported as match metadata (`priority`, `kind`, `endText`, ...)
//! - `(#make-range! "fold" @start @end)` reported as the match's explicit range
//! - injected languages parsed into their own layers with `Parser::set_included_ranges`
//! - incremental re-parsing from line edit notifications, with a full re-parse fallback

mod engine;

pub use engine::{
    TreeSitterEngineConfig, TreeSitterError, TreeSitterLanguageConfig, TreeSitterQueryEngine,
    TreeSitterUpdateMode,
};
