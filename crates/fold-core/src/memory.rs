//! In-memory host implementations.
//!
//! [`MemoryHost`] stores buffers in a [`Rope`] and reports every line-block replacement as the
//! [`EditNotification`] a real editor would send. [`RecordingRenderer`] keeps the markers it was
//! asked to draw. Both are useful for embedding `fold-core` in tests, benchmarks, and headless
//! tools.

use crate::edit::EditNotification;
use crate::host::{BufferHost, BufferId, BufferKind, DecorationHandle, DecorationRenderer};
use ropey::Rope;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

struct MemoryBuffer {
    rope: Rope,
    kind: BufferKind,
    language: Option<String>,
}

/// A [`BufferHost`] backed by ropes.
#[derive(Default)]
pub struct MemoryHost {
    next_id: u64,
    buffers: HashMap<BufferId, MemoryBuffer>,
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHost")
            .field("buffer_count", &self.buffers.len())
            .finish()
    }
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a normal buffer with the given language and text.
    pub fn open(&mut self, language: &str, text: &str) -> BufferId {
        self.open_with_kind(Some(language), text, BufferKind::Normal)
    }

    /// Open a buffer with an explicit kind.
    pub fn open_with_kind(
        &mut self,
        language: Option<&str>,
        text: &str,
        kind: BufferKind,
    ) -> BufferId {
        self.next_id = self.next_id.saturating_add(1);
        let id = BufferId(self.next_id);
        self.buffers.insert(
            id,
            MemoryBuffer {
                rope: Rope::from_str(text),
                kind,
                language: language.map(str::to_string),
            },
        );
        id
    }

    /// Close a buffer. Returns `false` if it was not open.
    pub fn close(&mut self, id: BufferId) -> bool {
        self.buffers.remove(&id).is_some()
    }

    /// Full text of a buffer.
    pub fn text(&self, id: BufferId) -> String {
        self.buffers
            .get(&id)
            .map(|b| b.rope.to_string())
            .unwrap_or_default()
    }

    /// Replace rows `rows` (0-based, half-open) with `new_lines` and return the matching
    /// notification.
    ///
    /// Removing every line leaves a single empty line behind, like a real editor buffer.
    pub fn replace_lines(
        &mut self,
        id: BufferId,
        rows: Range<usize>,
        new_lines: &[&str],
    ) -> EditNotification {
        let Some(buffer) = self.buffers.get_mut(&id) else {
            return EditNotification::new(rows.start, rows.start, rows.start);
        };
        let rope = &mut buffer.rope;
        let n = rope.len_lines();
        let first = rows.start.min(n);
        let last = rows.end.clamp(first, n);

        let mut block: Vec<&str> = new_lines.to_vec();
        if block.is_empty() && first == 0 && last == n {
            block.push("");
        }

        let (start, end, text) = if last < n {
            let text: String = block.iter().map(|l| format!("{l}\n")).collect();
            (rope.line_to_char(first), rope.line_to_char(last), text)
        } else if first == 0 {
            (0, rope.len_chars(), block.join("\n"))
        } else if first == n {
            let text: String = block.iter().map(|l| format!("\n{l}")).collect();
            (rope.len_chars(), rope.len_chars(), text)
        } else {
            let text: String = block.iter().map(|l| format!("\n{l}")).collect();
            (rope.line_to_char(first) - 1, rope.len_chars(), text)
        };

        rope.remove(start..end);
        rope.insert(start, &text);

        EditNotification::new(first, last, first + block.len())
    }
}

impl BufferHost for MemoryHost {
    fn get_lines(&self, buffer: BufferId, rows: Range<usize>) -> Vec<String> {
        let Some(buffer) = self.buffers.get(&buffer) else {
            return Vec::new();
        };
        let n = buffer.rope.len_lines();
        let end = rows.end.min(n);
        let start = rows.start.min(end);
        (start..end)
            .map(|row| {
                let mut text = buffer.rope.line(row).to_string();
                if text.ends_with('\n') {
                    text.pop();
                }
                if text.ends_with('\r') {
                    text.pop();
                }
                text
            })
            .collect()
    }

    fn line_count(&self, buffer: BufferId) -> usize {
        self.buffers
            .get(&buffer)
            .map(|b| b.rope.len_lines())
            .unwrap_or(0)
    }

    fn buffer_kind(&self, buffer: BufferId) -> BufferKind {
        self.buffers
            .get(&buffer)
            .map(|b| b.kind)
            .unwrap_or(BufferKind::Special)
    }

    fn language(&self, buffer: BufferId) -> Option<String> {
        self.buffers.get(&buffer).and_then(|b| b.language.clone())
    }
}

/// A marker drawn by [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMarker {
    /// Target buffer.
    pub buffer: BufferId,
    /// 1-based anchor line.
    pub line: usize,
    /// 1-based last folded line.
    pub end_line: usize,
    /// Display text.
    pub text: String,
    /// Display width in cells.
    pub width: usize,
}

/// A [`DecorationRenderer`] that records live markers.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next_handle: u64,
    live: BTreeMap<DecorationHandle, RenderedMarker>,
    render_calls: usize,
}

impl RecordingRenderer {
    /// Create an empty renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers currently drawn.
    pub fn live(&self) -> impl Iterator<Item = &RenderedMarker> {
        self.live.values()
    }

    /// Number of markers currently drawn.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Look up a live marker.
    pub fn marker(&self, handle: DecorationHandle) -> Option<&RenderedMarker> {
        self.live.get(&handle)
    }

    /// Total number of `render_marker` calls.
    pub fn render_calls(&self) -> usize {
        self.render_calls
    }
}

impl DecorationRenderer for RecordingRenderer {
    fn render_marker(
        &mut self,
        buffer: BufferId,
        line: usize,
        end_line: usize,
        text: &str,
        width: usize,
    ) -> DecorationHandle {
        self.next_handle = self.next_handle.saturating_add(1);
        self.render_calls += 1;
        let handle = DecorationHandle(self.next_handle);
        self.live.insert(
            handle,
            RenderedMarker {
                buffer,
                line,
                end_line,
                text: text.to_string(),
                width,
            },
        );
        handle
    }

    fn release_marker(&mut self, handle: DecorationHandle) {
        self.live.remove(&handle);
    }
}
