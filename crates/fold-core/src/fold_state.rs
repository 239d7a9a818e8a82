//! Per-buffer fold state.
//!
//! Line numbering convention in this module: `line` is 0-based (range coordinates), `lnum` is
//! 1-based (closed-fold markers, matching what an editor shows in its gutter).

use crate::edit::{EditNotification, apply_line_edit};
use crate::error::{FoldError, FoldResult};
use crate::host::{BufferId, DecorationRenderer};
use crate::marker::FoldedLineMarker;
use crate::range::{FoldKind, FoldRange, Position};
use crate::selector::select_smallest;
use std::ops::RangeInclusive;

/// Lifecycle of a buffer's fold state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStatus {
    /// No scan has been issued.
    Start,
    /// At least one scan is in flight.
    Pending,
    /// A range set is installed and no scan is in flight.
    Ready,
    /// Folding is disabled for this buffer until [`FoldState::reset`].
    Stopped,
}

/// Version issued to a scan; installs carrying an old ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScanTicket(pub u64);

/// Outcome of reconciling closed folds against an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldedLinesUpdate {
    /// Anchor lines (1-based, pre-edit) of folds that were forced open.
    pub reopened: Vec<usize>,
    /// Lines (1-based, post-edit) the window should close again, if any.
    pub reclose: Option<RangeInclusive<usize>>,
}

/// Fold ranges and closed-fold markers of one buffer.
#[derive(Debug, Clone)]
pub struct FoldState {
    buffer: BufferId,
    status: FoldStatus,
    version: u64,
    issued: u64,
    request_count: usize,
    ranges: Vec<FoldRange>,
    folded_lines: Vec<Option<FoldedLineMarker>>,
    folded_line_count: usize,
    provider: Option<String>,
}

impl FoldState {
    /// Create an empty state for `buffer`.
    pub fn new(buffer: BufferId) -> Self {
        Self {
            buffer,
            status: FoldStatus::Start,
            version: 0,
            issued: 0,
            request_count: 0,
            ranges: Vec::new(),
            folded_lines: Vec::new(),
            folded_line_count: 0,
            provider: None,
        }
    }

    /// Buffer this state belongs to.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Current lifecycle status.
    pub fn status(&self) -> FoldStatus {
        self.status
    }

    /// Version of the installed range set (0 before the first install).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Installed canonical ranges.
    pub fn ranges(&self) -> &[FoldRange] {
        &self.ranges
    }

    /// Number of currently closed folds.
    pub fn folded_line_count(&self) -> usize {
        self.folded_line_count
    }

    /// Id of the provider that produced the installed ranges.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Record which provider serves this buffer.
    pub fn select_provider(&mut self, provider: Option<String>) {
        self.provider = provider;
    }

    /// Mark a scan as outstanding.
    pub fn acquire_request(&mut self) {
        self.request_count += 1;
        if self.status != FoldStatus::Stopped {
            self.status = FoldStatus::Pending;
        }
    }

    /// Mark a scan as finished.
    pub fn release_request(&mut self) {
        self.request_count = self.request_count.saturating_sub(1);
        if self.request_count == 0 && self.status == FoldStatus::Pending {
            self.status = if self.version > 0 {
                FoldStatus::Ready
            } else {
                FoldStatus::Start
            };
        }
    }

    /// Returns `true` while a scan is outstanding.
    pub fn requested(&self) -> bool {
        self.request_count > 0
    }

    /// Issue a ticket for a new scan and mark it outstanding.
    ///
    /// Returns `None` once the state is stopped.
    pub fn begin_scan(&mut self) -> Option<ScanTicket> {
        if self.status == FoldStatus::Stopped {
            return None;
        }
        self.issued = self.issued.max(self.version) + 1;
        self.acquire_request();
        Some(ScanTicket(self.issued))
    }

    /// Install a canonical range set produced by the scan holding `ticket`.
    ///
    /// Installs are rejected when the state is stopped or when a newer (or equal) version is
    /// already installed. Closed folds whose anchor line still starts a range stay closed and
    /// follow that range's end line; the others are opened.
    pub fn install_ranges(
        &mut self,
        ticket: ScanTicket,
        ranges: Vec<FoldRange>,
        renderer: &mut dyn DecorationRenderer,
    ) -> bool {
        if self.status == FoldStatus::Stopped {
            return false;
        }
        if ticket.0 <= self.version {
            tracing::trace!(
                buffer = self.buffer.get(),
                ticket = ticket.0,
                installed = self.version,
                "dropping stale fold ranges"
            );
            return false;
        }

        self.version = ticket.0;
        self.ranges = ranges;
        self.reanchor_markers(renderer);
        if self.request_count == 0 {
            self.status = FoldStatus::Ready;
        }

        tracing::debug!(
            buffer = self.buffer.get(),
            version = self.version,
            ranges = self.ranges.len(),
            closed = self.folded_line_count,
            "installed fold ranges"
        );
        true
    }

    fn reanchor_markers(&mut self, renderer: &mut dyn DecorationRenderer) {
        for slot in self.folded_lines.iter_mut() {
            let Some(marker) = slot.as_mut() else {
                continue;
            };
            let lnum = marker.lnum();
            let start_line = lnum - 1;
            let old_end_line = marker.end_lnum() - 1;

            let starting = self
                .ranges
                .iter()
                .filter(|r| r.start_line() == start_line);
            let exact = starting.clone().find(|r| r.end_line() == old_end_line);
            let end_line = exact
                .or_else(|| starting.min_by_key(|r| r.end_line()))
                .map(FoldRange::end_line);

            match end_line {
                Some(end_line) => {
                    marker.update_virt_text(lnum, end_line + 1, None, false, renderer);
                }
                None => {
                    marker.delete_extmark(renderer);
                    *slot = None;
                    self.folded_line_count -= 1;
                }
            }
        }
    }

    /// Kind of the first installed range containing `line` (0-based).
    ///
    /// Ranges are visited in canonical order, so for nested ranges this returns the one that
    /// starts first (the outer one), not the innermost.
    pub fn line_kind(&self, line: usize) -> Option<FoldKind> {
        self.ranges
            .iter()
            .find(|r| r.contains_line(line))
            .map(|r| r.kind)
    }

    /// The most specific installed range spanning exactly `start_line..=end_line` (0-based).
    pub fn get_range(&self, start_line: usize, end_line: usize) -> Option<&FoldRange> {
        select_smallest(
            self.ranges
                .iter()
                .filter(|r| r.line_pair() == (start_line, end_line)),
        )
    }

    /// The closed-fold marker anchored at `lnum`.
    pub fn marker(&self, lnum: usize) -> Option<&FoldedLineMarker> {
        lnum.checked_sub(1)
            .and_then(|row| self.folded_lines.get(row))
            .and_then(Option::as_ref)
    }

    /// All closed-fold markers in line order.
    pub fn markers(&self) -> impl Iterator<Item = &FoldedLineMarker> {
        self.folded_lines.iter().flatten()
    }

    /// Close the fold `lnum..=end_lnum` with the given display text.
    ///
    /// Closing an already-closed fold with identical text and width does nothing; a closed fold
    /// with different text is re-rendered in place. `line_count` is the buffer's current line
    /// count; if the marker map has drifted from it, every marker is dropped first.
    ///
    /// Returns `true` if a marker was created or re-rendered.
    pub fn close_fold(
        &mut self,
        lnum: usize,
        end_lnum: usize,
        text: &str,
        width: usize,
        line_count: usize,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldResult<bool> {
        if self.folded_lines.len() != line_count {
            self.reset_folded_lines(line_count, renderer);
        }
        for line in [lnum, end_lnum] {
            if line == 0 || line > line_count {
                return Err(FoldError::OutOfRange { line, line_count });
            }
        }
        if end_lnum < lnum {
            return Err(FoldError::MalformedRange {
                start: Position::new(lnum - 1, 0),
                end: Position::new(end_lnum - 1, 0),
            });
        }

        if let Some(marker) = self.folded_lines[lnum - 1].as_mut() {
            return Ok(marker.update_virt_text(
                lnum,
                end_lnum,
                Some((text, width)),
                false,
                renderer,
            ));
        }

        let mut marker = FoldedLineMarker::new(self.buffer, lnum, end_lnum, text.to_string(), width);
        marker.update_virt_text(lnum, end_lnum, None, true, renderer);
        self.folded_lines[lnum - 1] = Some(marker);
        self.folded_line_count += 1;
        Ok(true)
    }

    /// Open the fold anchored at `lnum`. Returns `false` if none was closed there.
    pub fn open_fold(&mut self, lnum: usize, renderer: &mut dyn DecorationRenderer) -> bool {
        let Some(slot) = lnum
            .checked_sub(1)
            .and_then(|row| self.folded_lines.get_mut(row))
        else {
            return false;
        };
        match slot.take() {
            Some(mut marker) => {
                marker.delete_extmark(renderer);
                self.folded_line_count -= 1;
                true
            }
            None => false,
        }
    }

    /// Drop every marker and size the marker map to `line_count`.
    pub fn reset_folded_lines(&mut self, line_count: usize, renderer: &mut dyn DecorationRenderer) {
        if self.folded_line_count > 0 {
            tracing::debug!(
                buffer = self.buffer.get(),
                markers = self.folded_line_count,
                tracked = self.folded_lines.len(),
                line_count,
                "resetting folded lines"
            );
        }
        for marker in self.folded_lines.iter_mut().flatten() {
            marker.delete_extmark(renderer);
        }
        self.folded_lines.clear();
        self.folded_lines.resize_with(line_count, || None);
        self.folded_line_count = 0;
    }

    /// Reconcile closed folds with an edit of rows `first..last` → `first..last_updated`.
    ///
    /// Folds overlapping the edited lines (`first + 1..=last`, 1-based) are opened. If any were
    /// opened and the edit left lines behind, the caller should close `first + 1..=last_updated`
    /// again in its window. Remaining markers then shift with their lines, and a fold that a pure
    /// insertion landed inside grows to keep covering its lines.
    pub fn handle_folded_lines_changed(
        &mut self,
        first: usize,
        last: usize,
        last_updated: usize,
        renderer: &mut dyn DecorationRenderer,
    ) -> FoldedLinesUpdate {
        let mut update = FoldedLinesUpdate::default();

        if last > first && self.folded_line_count > 0 {
            let touched: Vec<usize> = self
                .markers()
                .filter(|m| m.lnum() <= last && m.end_lnum() > first)
                .map(FoldedLineMarker::lnum)
                .collect();
            for lnum in touched {
                if self.open_fold(lnum, renderer) {
                    update.reopened.push(lnum);
                }
            }
            if !update.reopened.is_empty() && last_updated > first {
                update.reclose = Some(first + 1..=last_updated);
            }
        }

        let edit = EditNotification::new(first, last, last_updated);
        let applied = apply_line_edit(&mut self.folded_lines, edit);
        let delta = applied.delta();
        if delta != 0 {
            for (row, slot) in self.folded_lines.iter_mut().enumerate() {
                let Some(marker) = slot.as_mut() else {
                    continue;
                };
                let lnum = row + 1;
                // Surviving folds never end inside the replaced rows, so an end at or past
                // `last_line` moves with the edit. This also covers insertions inside a fold.
                let end_lnum = if marker.end_lnum() > applied.last_line {
                    marker
                        .end_lnum()
                        .saturating_add_signed(delta)
                        .max(lnum)
                } else {
                    marker.end_lnum()
                };
                if marker.lnum() != lnum || marker.end_lnum() != end_lnum {
                    marker.update_virt_text(lnum, end_lnum, None, false, renderer);
                }
            }
        }

        update
    }

    /// Stop folding for this buffer, releasing every marker.
    pub fn stop(&mut self, renderer: &mut dyn DecorationRenderer) {
        let line_count = self.folded_lines.len();
        self.reset_folded_lines(line_count, renderer);
        self.status = FoldStatus::Stopped;
    }

    /// Return to [`FoldStatus::Start`], dropping ranges and markers.
    ///
    /// The version counter is kept so scans issued before the reset still lose.
    pub fn reset(&mut self, renderer: &mut dyn DecorationRenderer) {
        self.reset_folded_lines(0, renderer);
        self.ranges.clear();
        self.request_count = 0;
        self.provider = None;
        self.status = FoldStatus::Start;
    }
}
