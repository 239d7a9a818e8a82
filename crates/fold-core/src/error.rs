//! Error type shared by the folding engine.
//!
//! [`FoldError::Fallback`] is the one variant callers are expected to handle as control flow.

use crate::host::BufferId;
use crate::range::Position;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by the folding engine.
pub enum FoldError {
    #[error("line {line} is out of range (line count {line_count})")]
    /// A line index fell outside the cached buffer.
    OutOfRange {
        /// The requested 1-based line.
        line: usize,
        /// The cached line count at the time of the request.
        line_count: usize,
    },

    #[error("no fold query for language '{language}', use another range provider")]
    /// The buffer's language has no fold query; the caller must switch providers.
    ///
    /// This is a recoverable control signal, not a fault. Use [`FoldError::is_fallback`] to
    /// tell it apart from real failures.
    Fallback {
        /// The language without a fold query.
        language: String,
    },

    #[error("malformed range: end {end:?} is before start {start:?}")]
    /// A query or decoration produced a backward range.
    MalformedRange {
        /// Range start.
        start: Position,
        /// Range end.
        end: Position,
    },

    #[error("buffer {0:?} is not tracked")]
    /// The buffer has no fold state in the registry.
    BufferNotFound(BufferId),
}

impl FoldError {
    /// Returns `true` if this error asks the caller to use an alternative range provider.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Result alias used throughout `fold-core`.
pub type FoldResult<T> = Result<T, FoldError>;
