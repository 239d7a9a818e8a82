//! Incremental per-buffer line cache.
//!
//! The cache holds one `Option<String>` per buffer line. Edit notifications are queued as they
//! arrive and replayed lazily on the next read: replay only shifts rows and marks rewritten rows as
//! stale (`None`). Stale rows are then re-fetched from the host either hunk by hunk or, when the
//! damage is widespread, with a single full fetch (see [`RefreshPolicy`]).

use crate::config::RefreshPolicy;
use crate::edit::{EditNotification, apply_line_edit};
use crate::error::{FoldError, FoldResult};
use crate::host::{BufferHost, BufferId};
use std::collections::VecDeque;
use std::ops::Range;

/// How the cache reconciled itself on the last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheRefresh {
    /// First fetch after (re)attaching.
    Initial,
    /// Every line was re-fetched because too much was stale.
    Full,
    /// Replay disagreed with the host (line count or hunk size), so every line was re-fetched.
    Resynced,
    /// Only the given number of stale hunks were re-fetched.
    Hunks(usize),
    /// Nothing was stale.
    Clean,
}

/// Line contents of one host buffer, kept in sync through [`EditNotification`]s.
#[derive(Debug, Clone)]
pub struct LineCache {
    buffer: BufferId,
    lines: Vec<Option<String>>,
    pending: VecDeque<EditNotification>,
    attached: bool,
    policy: RefreshPolicy,
    last_refresh: Option<CacheRefresh>,
}

impl LineCache {
    /// Create a detached cache; the first read fetches the whole buffer.
    pub fn new(buffer: BufferId, policy: RefreshPolicy) -> Self {
        Self {
            buffer,
            lines: Vec::new(),
            pending: VecDeque::new(),
            attached: false,
            policy,
            last_refresh: None,
        }
    }

    /// The host buffer this cache mirrors.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Forget all cached content; the next read performs a full fetch.
    pub fn reattach(&mut self) {
        self.attached = false;
        self.lines.clear();
        self.pending.clear();
    }

    /// Queue an edit notification for replay on the next read.
    pub fn push_edit(&mut self, edit: EditNotification) {
        if self.attached {
            self.pending.push_back(edit);
        }
    }

    /// Number of queued notifications.
    pub fn pending_edits(&self) -> usize {
        self.pending.len()
    }

    /// Number of lines currently tracked (after the last replay).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// How the last [`LineCache::sync`] reconciled the cache.
    pub fn last_refresh(&self) -> Option<CacheRefresh> {
        self.last_refresh
    }

    /// Replay queued notifications and re-fetch stale lines.
    pub fn sync(&mut self, host: &dyn BufferHost) -> CacheRefresh {
        let refresh = self.reconcile(host);
        self.last_refresh = Some(refresh);
        refresh
    }

    fn reconcile(&mut self, host: &dyn BufferHost) -> CacheRefresh {
        if !self.attached {
            self.fetch_all(host);
            self.attached = true;
            self.pending.clear();
            return CacheRefresh::Initial;
        }

        if self.pending.is_empty() {
            return CacheRefresh::Clean;
        }

        while let Some(edit) = self.pending.pop_front() {
            apply_line_edit(&mut self.lines, edit);
        }

        let host_count = host.line_count(self.buffer);
        if host_count != self.lines.len() {
            tracing::warn!(
                buffer = self.buffer.get(),
                cached = self.lines.len(),
                host = host_count,
                "line count diverged after replay, refetching buffer"
            );
            self.fetch_all(host);
            return CacheRefresh::Resynced;
        }

        let hunks = self.missing_hunks();
        if hunks.is_empty() {
            return CacheRefresh::Clean;
        }

        let missing = hunks.iter().map(|h| h.len()).sum::<usize>();
        if self
            .policy
            .prefers_full_refresh(missing, hunks.len(), self.lines.len())
        {
            tracing::debug!(
                buffer = self.buffer.get(),
                missing,
                hunks = hunks.len(),
                "refetching whole buffer"
            );
            self.fetch_all(host);
            return CacheRefresh::Full;
        }

        for hunk in &hunks {
            let fetched = host.get_lines(self.buffer, hunk.clone());
            if fetched.len() != hunk.len() {
                tracing::warn!(
                    buffer = self.buffer.get(),
                    requested = hunk.len(),
                    got = fetched.len(),
                    "short hunk fetch, refetching buffer"
                );
                self.fetch_all(host);
                return CacheRefresh::Resynced;
            }
            for (slot, text) in self.lines[hunk.clone()].iter_mut().zip(fetched) {
                *slot = Some(text);
            }
        }

        tracing::trace!(buffer = self.buffer.get(), hunks = hunks.len(), "patched hunks");
        CacheRefresh::Hunks(hunks.len())
    }

    fn fetch_all(&mut self, host: &dyn BufferHost) {
        let count = host.line_count(self.buffer);
        self.lines = host
            .get_lines(self.buffer, 0..count)
            .into_iter()
            .map(Some)
            .collect();
    }

    /// Maximal runs of stale rows (0-based, half-open).
    pub fn missing_hunks(&self) -> Vec<Range<usize>> {
        let mut hunks = Vec::new();
        let mut start = None;
        for (row, line) in self.lines.iter().enumerate() {
            match (line.is_none(), start) {
                (true, None) => start = Some(row),
                (false, Some(s)) => {
                    hunks.push(s..row);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            hunks.push(s..self.lines.len());
        }
        hunks
    }

    /// Read lines `start..=end` (1-based, inclusive).
    ///
    /// A negative `end` counts from the end: `-1` is the last line.
    pub fn lines(
        &mut self,
        host: &dyn BufferHost,
        start: usize,
        end: isize,
    ) -> FoldResult<Vec<&str>> {
        self.sync(host);

        let line_count = self.lines.len();
        if start == 0 || start > line_count {
            return Err(FoldError::OutOfRange {
                line: start,
                line_count,
            });
        }

        let end = if end < 0 {
            (line_count as isize + end + 1).max(0) as usize
        } else {
            (end as usize).min(line_count)
        };
        if end < start {
            return Ok(Vec::new());
        }

        Ok(self.lines[start - 1..end]
            .iter()
            .map(|line| line.as_deref().unwrap_or_default())
            .collect())
    }

    /// Read a single 1-based line.
    pub fn line(&mut self, host: &dyn BufferHost, lnum: usize) -> FoldResult<&str> {
        self.sync(host);
        let line_count = self.lines.len();
        match lnum.checked_sub(1).and_then(|row| self.lines.get(row)) {
            Some(line) => Ok(line.as_deref().unwrap_or_default()),
            None => Err(FoldError::OutOfRange {
                line: lnum,
                line_count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_first_read_fetches_everything() {
        let mut host = MemoryHost::new();
        let id = host.open("rust", "a\nb\nc");
        let mut cache = LineCache::new(id, RefreshPolicy::default());

        assert_eq!(cache.lines(&host, 1, -1).unwrap(), vec!["a", "b", "c"]);
        assert_eq!(cache.last_refresh(), Some(CacheRefresh::Initial));

        cache.lines(&host, 1, -1).unwrap();
        assert_eq!(cache.last_refresh(), Some(CacheRefresh::Clean));
    }

    #[test]
    fn test_negative_end_index() {
        let mut host = MemoryHost::new();
        let id = host.open("rust", &numbered(5));
        let mut cache = LineCache::new(id, RefreshPolicy::default());

        assert_eq!(cache.lines(&host, 4, -1).unwrap(), vec!["line 4", "line 5"]);
        assert_eq!(cache.lines(&host, 2, -3).unwrap(), vec!["line 2", "line 3"]);
        assert!(cache.lines(&host, 5, -6).unwrap().is_empty());
    }

    #[test]
    fn test_start_out_of_range() {
        let mut host = MemoryHost::new();
        let id = host.open("rust", "a\nb");
        let mut cache = LineCache::new(id, RefreshPolicy::default());

        let err = cache.lines(&host, 3, -1).unwrap_err();
        assert_eq!(
            err,
            FoldError::OutOfRange {
                line: 3,
                line_count: 2
            }
        );
        assert!(cache.line(&host, 0).is_err());
    }

    #[test]
    fn test_single_edit_patches_one_hunk() {
        let mut host = MemoryHost::new();
        let id = host.open("rust", &numbered(10));
        let mut cache = LineCache::new(id, RefreshPolicy::default());
        cache.sync(&host);

        let edit = host.replace_lines(id, 4..5, &["changed"]);
        cache.push_edit(edit);

        assert_eq!(cache.line(&host, 5).unwrap(), "changed");
        assert_eq!(cache.last_refresh(), Some(CacheRefresh::Hunks(1)));
    }

    #[test]
    fn test_scattered_damage_triggers_full_refresh() {
        let mut host = MemoryHost::new();
        let id = host.open("rust", &numbered(10));
        let mut cache = LineCache::new(id, RefreshPolicy::default());
        cache.sync(&host);

        for row in [0, 3, 6, 9] {
            let edit = host.replace_lines(id, row..row + 1, &["x"]);
            cache.push_edit(edit);
        }

        cache.sync(&host);
        assert_eq!(cache.last_refresh(), Some(CacheRefresh::Full));
        assert_eq!(cache.line(&host, 10).unwrap(), "x");
    }

    #[test]
    fn test_bogus_notification_resyncs() {
        let mut host = MemoryHost::new();
        let id = host.open("rust", &numbered(6));
        let mut cache = LineCache::new(id, RefreshPolicy::default());
        cache.sync(&host);

        // Claims two inserted rows that the host never got.
        cache.push_edit(EditNotification::new(2, 2, 4));
        assert_eq!(cache.sync(&host), CacheRefresh::Resynced);
        assert_eq!(cache.line_count(), 6);
        assert_eq!(cache.line(&host, 6).unwrap(), "line 6");
    }

    #[test]
    fn test_missing_hunks_scan() {
        let mut cache = LineCache::new(BufferId(1), RefreshPolicy::default());
        cache.attached = true;
        cache.lines = vec![
            None,
            Some("a".to_string()),
            None,
            None,
            Some("b".to_string()),
            None,
        ];
        assert_eq!(cache.missing_hunks(), vec![0..1, 2..4, 5..6]);
    }
}
