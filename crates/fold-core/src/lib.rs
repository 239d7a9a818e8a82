#![warn(missing_docs)]
//! Fold Core - Incremental Folding Engine for Host Editors
//!
//! # Overview
//!
//! `fold-core` computes folding ranges for buffers owned by a host editor and keeps closed folds
//! anchored while the host keeps editing. It does not store text, parse, or draw: the host
//! provides buffer lines, a structural query engine supplies candidate ranges, and a renderer
//! draws closed-fold markers.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  FoldRegistry (per-buffer state, public API)│  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  FoldBuffer = LineCache + FoldState         │  ← Composition
//! ├─────────────────────────────────────────────┤
//! │  FoldState + FoldedLineMarker               │  ← Closed folds
//! ├─────────────────────────────────────────────┤
//! │  RangeCandidateSource → canonicalize        │  ← Range selection
//! ├─────────────────────────────────────────────┤
//! │  LineCache (edit replay, hunk refetch)      │  ← Line access
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use fold_core::{FoldConfig, FoldRegistry, MemoryHost, RecordingRenderer};
//!
//! let mut host = MemoryHost::new();
//! let id = host.open("rust", "fn main() {\n    body();\n}\n");
//! let mut renderer = RecordingRenderer::new();
//! let mut registry = FoldRegistry::new(FoldConfig::default());
//!
//! // Host edits are forwarded as they happen; reads replay them lazily.
//! let edit = host.replace_lines(id, 1..2, &["    first();", "    second();"]);
//! registry.notify_edit(id, edit, &mut renderer);
//! ```
//!
//! # Module Description
//!
//! - [`line_cache`] - incremental line cache driven by edit notifications
//! - [`candidates`] - fold candidates from structural query matches
//! - [`selector`] - smallest-enclosing deduplication and canonical ordering
//! - [`fold_state`] - versioned range installs and closed-fold markers
//! - [`marker`] - closed-fold marker rendering
//! - [`registry`] - per-buffer registry and public API
//! - [`memory`] - in-memory host and renderer

pub mod candidates;
pub mod config;
pub mod edit;
pub mod error;
pub mod fold_buffer;
pub mod fold_state;
pub mod host;
pub mod line_cache;
pub mod marker;
pub mod memory;
pub mod query;
pub mod range;
pub mod registry;
pub mod selector;

pub use candidates::{RangeCandidateSource, normalize_candidates};
pub use config::{FoldConfig, RefreshPolicy};
pub use edit::{EditNotification, apply_line_edit};
pub use error::{FoldError, FoldResult};
pub use fold_buffer::FoldBuffer;
pub use fold_state::{FoldState, FoldStatus, FoldedLinesUpdate, ScanTicket};
pub use host::{BufferHost, BufferId, BufferKind, DecorationHandle, DecorationRenderer};
pub use line_cache::{CacheRefresh, LineCache};
pub use marker::{FoldedLineMarker, display_width, fold_text};
pub use memory::{MemoryHost, RecordingRenderer, RenderedMarker};
pub use query::{LanguageLayer, NodeSpan, QueryCapture, QueryMatch, StructuralQuery};
pub use range::{FoldKind, FoldRange, Position, RenderMetadata};
pub use registry::FoldRegistry;
pub use selector::{canonicalize, select_smallest};
