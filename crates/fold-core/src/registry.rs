//! Per-buffer registry and public fold API.
//!
//! A [`FoldRegistry`] owns one [`FoldBuffer`] per host buffer, created on first use and dropped
//! on [`FoldRegistry::dispose`]. It also remembers filetypes whose root language turned out to
//! have no fold query, so repeated requests for such buffers fall back without another scan.

use crate::config::FoldConfig;
use crate::edit::EditNotification;
use crate::error::{FoldError, FoldResult};
use crate::fold_buffer::FoldBuffer;
use crate::fold_state::{FoldStatus, FoldedLinesUpdate};
use crate::host::{BufferHost, BufferId, DecorationRenderer};
use crate::query::StructuralQuery;
use crate::range::{FoldKind, FoldRange};
use std::collections::{HashMap, HashSet};

/// Registry of fold state for every tracked buffer.
#[derive(Default)]
pub struct FoldRegistry {
    config: FoldConfig,
    buffers: HashMap<BufferId, FoldBuffer>,
    unsupported_languages: HashSet<String>,
}

impl std::fmt::Debug for FoldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoldRegistry")
            .field("buffer_count", &self.buffers.len())
            .field("unsupported_languages", &self.unsupported_languages)
            .finish()
    }
}

impl FoldRegistry {
    /// Create a registry.
    pub fn new(config: FoldConfig) -> Self {
        Self {
            config,
            buffers: HashMap::new(),
            unsupported_languages: HashSet::new(),
        }
    }

    /// Registry configuration.
    pub fn config(&self) -> &FoldConfig {
        &self.config
    }

    /// Number of tracked buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if no buffer is tracked.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Fold buffer for `id`, if tracked.
    pub fn buffer(&self, id: BufferId) -> Option<&FoldBuffer> {
        self.buffers.get(&id)
    }

    /// Mutable fold buffer for `id`, if tracked.
    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut FoldBuffer> {
        self.buffers.get_mut(&id)
    }

    fn tracked(&self, id: BufferId) -> FoldResult<&FoldBuffer> {
        self.buffers.get(&id).ok_or(FoldError::BufferNotFound(id))
    }

    fn tracked_mut(&mut self, id: BufferId) -> FoldResult<&mut FoldBuffer> {
        self.buffers
            .get_mut(&id)
            .ok_or(FoldError::BufferNotFound(id))
    }

    /// Returns `true` if `language` is known to have no fold query.
    pub fn is_unsupported(&self, language: &str) -> bool {
        self.unsupported_languages.contains(language)
    }

    /// Forget that `language` had no fold query (e.g. after the host installed one).
    pub fn clear_unsupported(&mut self, language: &str) -> bool {
        self.unsupported_languages.remove(language)
    }

    /// Compute the canonical fold ranges of `id` using `engine`.
    ///
    /// - `Ok(Some(ranges))`: the installed, sorted range set
    /// - `Ok(None)`: the buffer is not foldable (special buffer kind) or folding is stopped
    /// - `Err(FoldError::Fallback { .. })`: the buffer's root language has no fold query; use
    ///   another provider. Injected languages without a fold query are skipped instead.
    pub fn get_folds(
        &mut self,
        host: &dyn BufferHost,
        id: BufferId,
        engine: &dyn StructuralQuery,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<Option<Vec<FoldRange>>> {
        let kind = host.buffer_kind(id);
        let language = host.language(id);
        let config = &self.config;
        let buffer = self
            .buffers
            .entry(id)
            .or_insert_with(|| FoldBuffer::new(id, config));

        if buffer.state().status() == FoldStatus::Stopped {
            return Ok(None);
        }
        if !kind.is_foldable() {
            tracing::debug!(buffer = id.get(), ?kind, "buffer kind is not foldable");
            buffer.stop(renderer);
            return Ok(None);
        }
        if let Some(language) = language.as_ref()
            && self.unsupported_languages.contains(language)
        {
            buffer.state_mut().select_provider(None);
            return Err(FoldError::Fallback {
                language: language.clone(),
            });
        }

        match buffer.scan(engine, renderer) {
            Ok(ranges) => {
                let ranges = ranges.map(<[FoldRange]>::to_vec);
                buffer
                    .state_mut()
                    .select_provider(Some(engine.provider_id().to_string()));
                Ok(ranges)
            }
            Err(FoldError::Fallback { language: root }) => {
                // Remembered per filetype, which is what the next request is checked against.
                let language = language.unwrap_or(root);
                tracing::debug!(buffer = id.get(), %language, "no fold query, falling back");
                buffer.state_mut().select_provider(None);
                self.unsupported_languages.insert(language.clone());
                Err(FoldError::Fallback { language })
            }
            Err(err) => Err(err),
        }
    }

    /// Forward a host edit to the buffer's line cache and closed folds.
    ///
    /// Edits for untracked buffers are ignored (`None`).
    pub fn notify_edit(
        &mut self,
        id: BufferId,
        edit: EditNotification,
        renderer: &mut dyn DecorationRenderer,
    ) -> Option<FoldedLinesUpdate> {
        let buffer = self.buffers.get_mut(&id)?;
        Some(buffer.notify_edit(edit, renderer))
    }

    /// Read lines `start..=end` (1-based) of a tracked buffer through its line cache.
    pub fn lines(
        &mut self,
        host: &dyn BufferHost,
        id: BufferId,
        start: usize,
        end: isize,
    ) -> FoldResult<Vec<&str>> {
        self.tracked_mut(id)?.lines(host, start, end)
    }

    /// Close `lnum..=end_lnum` (1-based) with explicit display text.
    #[allow(clippy::too_many_arguments)]
    pub fn close_fold(
        &mut self,
        host: &dyn BufferHost,
        id: BufferId,
        lnum: usize,
        end_lnum: usize,
        text: &str,
        width: usize,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<bool> {
        self.tracked_mut(id)?
            .close_fold(host, lnum, end_lnum, text, width, renderer)
    }

    /// Close the innermost range starting at `lnum` (1-based) with rendered default text.
    pub fn close_fold_at(
        &mut self,
        host: &dyn BufferHost,
        id: BufferId,
        lnum: usize,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<bool> {
        self.tracked_mut(id)?.close_fold_at(host, lnum, renderer)
    }

    /// Open the fold anchored at `lnum` (1-based).
    pub fn open_fold(
        &mut self,
        id: BufferId,
        lnum: usize,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<bool> {
        Ok(self.tracked_mut(id)?.open_fold(lnum, renderer))
    }

    /// Kind of the first range containing `line` (0-based).
    pub fn line_kind(&self, id: BufferId, line: usize) -> FoldResult<Option<FoldKind>> {
        Ok(self.tracked(id)?.state().line_kind(line))
    }

    /// Most specific range spanning exactly `start_line..=end_line` (0-based).
    pub fn get_range(
        &self,
        id: BufferId,
        start_line: usize,
        end_line: usize,
    ) -> FoldResult<Option<&FoldRange>> {
        Ok(self.tracked(id)?.state().get_range(start_line, end_line))
    }

    /// Reset a buffer to its initial state, re-enabling folding if it was stopped.
    pub fn reset(&mut self, id: BufferId, renderer: &mut dyn DecorationRenderer) -> FoldResult<()> {
        self.tracked_mut(id)?.reset(renderer);
        Ok(())
    }

    /// Drop a buffer's state, releasing its markers. Returns `false` if it was not tracked.
    pub fn dispose(&mut self, id: BufferId, renderer: &mut dyn DecorationRenderer) -> bool {
        match self.buffers.remove(&id) {
            Some(mut buffer) => {
                buffer.stop(renderer);
                true
            }
            None => false,
        }
    }
}
