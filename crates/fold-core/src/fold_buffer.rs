//! A buffer's line cache and fold state, owned together.

use crate::candidates::{RangeCandidateSource, normalize_candidates};
use crate::config::FoldConfig;
use crate::edit::EditNotification;
use crate::error::FoldResult;
use crate::fold_state::{FoldState, FoldedLinesUpdate, ScanTicket};
use crate::host::{BufferHost, BufferId, DecorationRenderer};
use crate::line_cache::LineCache;
use crate::marker::{display_width, fold_text};
use crate::query::StructuralQuery;
use crate::range::FoldRange;
use crate::selector::canonicalize;

/// Line cache + fold state of one host buffer.
#[derive(Debug, Clone)]
pub struct FoldBuffer {
    cache: LineCache,
    state: FoldState,
    source: RangeCandidateSource,
    ellipsis: String,
}

impl FoldBuffer {
    /// Create the fold buffer for `buffer`. Nothing is fetched until the first read.
    pub fn new(buffer: BufferId, config: &FoldConfig) -> Self {
        Self {
            cache: LineCache::new(buffer, config.refresh),
            state: FoldState::new(buffer),
            source: RangeCandidateSource::new(config),
            ellipsis: config.ellipsis.clone(),
        }
    }

    /// Host buffer id.
    pub fn buffer(&self) -> BufferId {
        self.state.buffer()
    }

    /// Fold state.
    pub fn state(&self) -> &FoldState {
        &self.state
    }

    /// Mutable fold state.
    pub fn state_mut(&mut self) -> &mut FoldState {
        &mut self.state
    }

    /// Line cache.
    pub fn cache(&self) -> &LineCache {
        &self.cache
    }

    /// Read lines `start..=end` (1-based; negative `end` counts from the end).
    pub fn lines(
        &mut self,
        host: &dyn BufferHost,
        start: usize,
        end: isize,
    ) -> FoldResult<Vec<&str>> {
        self.cache.lines(host, start, end)
    }

    /// Current line count, after replaying queued edits.
    pub fn line_count(&mut self, host: &dyn BufferHost) -> usize {
        self.cache.sync(host);
        self.cache.line_count()
    }

    /// Record a host edit: queue it for the line cache and reconcile closed folds.
    pub fn notify_edit(
        &mut self,
        edit: EditNotification,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldedLinesUpdate {
        self.cache.push_edit(edit);
        self.state.handle_folded_lines_changed(
            edit.first_line,
            edit.last_line,
            edit.last_line_updated,
            renderer,
        )
    }

    /// Start a scan. Returns `None` if folding is stopped for this buffer.
    pub fn begin_scan(&mut self) -> Option<ScanTicket> {
        self.state.begin_scan()
    }

    /// Query `engine` and reduce its candidates to a canonical range set.
    pub fn collect(&self, engine: &dyn StructuralQuery) -> FoldResult<Vec<FoldRange>> {
        let candidates = self.source.candidates(engine)?;
        Ok(canonicalize(normalize_candidates(candidates)))
    }

    /// Finish the scan holding `ticket`.
    ///
    /// Returns `Ok(true)` if the ranges were installed, `Ok(false)` if a newer scan already won,
    /// and the scan's error otherwise.
    pub fn finish_scan(
        &mut self,
        ticket: ScanTicket,
        ranges: FoldResult<Vec<FoldRange>>,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<bool> {
        self.state.release_request();
        let ranges = ranges?;
        Ok(self.state.install_ranges(ticket, ranges, renderer))
    }

    /// Scan synchronously: begin, collect, finish.
    pub fn scan(
        &mut self,
        engine: &dyn StructuralQuery,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<Option<&[FoldRange]>> {
        let Some(ticket) = self.begin_scan() else {
            return Ok(None);
        };
        let ranges = self.collect(engine);
        self.finish_scan(ticket, ranges, renderer)?;
        Ok(Some(self.state.ranges()))
    }

    /// Close `lnum..=end_lnum` (1-based) with explicit display text.
    pub fn close_fold(
        &mut self,
        host: &dyn BufferHost,
        lnum: usize,
        end_lnum: usize,
        text: &str,
        width: usize,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<bool> {
        let line_count = self.line_count(host);
        self.state
            .close_fold(lnum, end_lnum, text, width, line_count, renderer)
    }

    /// Close the innermost installed range starting at `lnum` (1-based), rendering its text
    /// from the cached first and last lines.
    ///
    /// Returns `Ok(false)` if no range starts on that line.
    pub fn close_fold_at(
        &mut self,
        host: &dyn BufferHost,
        lnum: usize,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<bool> {
        let Some(start_line) = lnum.checked_sub(1) else {
            return Ok(false);
        };
        let Some(range) = self
            .state
            .ranges()
            .iter()
            .filter(|r| r.start_line() == start_line)
            .min_by_key(|r| r.end_line())
            .cloned()
        else {
            return Ok(false);
        };

        let end_lnum = range.end_line() + 1;
        let first = self.cache.line(host, lnum)?.to_string();
        let last = self.cache.line(host, end_lnum)?.to_string();
        let text = fold_text(&first, &last, range.render.as_ref(), &self.ellipsis);
        let width = display_width(&text);
        self.close_fold(host, lnum, end_lnum, &text, width, renderer)
    }

    /// Open the fold anchored at `lnum` (1-based).
    pub fn open_fold(&mut self, lnum: usize, renderer: &mut dyn DecorationRenderer) -> bool {
        self.state.open_fold(lnum, renderer)
    }

    /// Stop folding and release every marker.
    pub fn stop(&mut self, renderer: &mut dyn DecorationRenderer) {
        self.state.stop(renderer);
    }

    /// Drop all derived state; the next read re-fetches the buffer.
    pub fn reset(&mut self, renderer: &mut dyn DecorationRenderer) {
        self.state.reset(renderer);
        self.cache.reattach();
    }
}
