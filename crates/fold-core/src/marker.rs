//! Closed-fold markers.

use crate::host::{BufferId, DecorationHandle, DecorationRenderer};
use crate::range::RenderMetadata;
use unicode_width::UnicodeWidthStr;

/// Render state of one closed fold.
///
/// Line numbers are 1-based. The marker owns its decoration handle; the handle is released by
/// [`FoldedLineMarker::delete_extmark`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldedLineMarker {
    buffer: BufferId,
    lnum: usize,
    end_lnum: usize,
    text: String,
    width: usize,
    handle: Option<DecorationHandle>,
}

impl FoldedLineMarker {
    /// Create an unrendered marker.
    pub fn new(buffer: BufferId, lnum: usize, end_lnum: usize, text: String, width: usize) -> Self {
        Self {
            buffer,
            lnum,
            end_lnum,
            text,
            width,
            handle: None,
        }
    }

    /// 1-based anchor line.
    pub fn lnum(&self) -> usize {
        self.lnum
    }

    /// 1-based last folded line.
    pub fn end_lnum(&self) -> usize {
        self.end_lnum
    }

    /// Display text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Display width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Current decoration handle, if rendered.
    pub fn handle(&self) -> Option<DecorationHandle> {
        self.handle
    }

    /// Returns `true` if `width` differs from the rendered width.
    pub fn width_changed(&self, width: usize) -> bool {
        self.width != width
    }

    /// Returns `true` if `text` differs from the rendered text.
    pub fn text_changed(&self, text: &str) -> bool {
        self.text != text
    }

    /// Update the fold span and text, re-rendering only when something visible changed.
    ///
    /// Returns `true` if the renderer was called.
    pub fn update_virt_text(
        &mut self,
        lnum: usize,
        end_lnum: usize,
        text: Option<(&str, usize)>,
        force_render: bool,
        renderer: &mut dyn DecorationRenderer,
    ) -> bool {
        let mut dirty = force_render || self.handle.is_none();
        if self.lnum != lnum || self.end_lnum != end_lnum {
            self.lnum = lnum;
            self.end_lnum = end_lnum;
            dirty = true;
        }
        if let Some((text, width)) = text
            && (self.text_changed(text) || self.width_changed(width))
        {
            self.text = text.to_string();
            self.width = width;
            dirty = true;
        }

        if !dirty {
            return false;
        }

        if let Some(old) = self.handle.take() {
            renderer.release_marker(old);
        }
        self.handle = Some(renderer.render_marker(
            self.buffer,
            self.lnum,
            self.end_lnum,
            &self.text,
            self.width,
        ));
        true
    }

    /// Release the decoration. The marker value stays usable but is no longer drawn.
    pub fn delete_extmark(&mut self, renderer: &mut dyn DecorationRenderer) {
        if let Some(handle) = self.handle.take() {
            renderer.release_marker(handle);
        }
    }
}

/// Display width of `text` in terminal cells.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Build the default closed-fold text from the first and last folded lines.
///
/// The first line keeps its indentation; trailing whitespace is dropped. `render.end_text`
/// replaces the trimmed last line when present.
pub fn fold_text(
    first_line: &str,
    last_line: &str,
    render: Option<&RenderMetadata>,
    ellipsis: &str,
) -> String {
    let mut text = first_line.trim_end().to_string();
    if let Some(start_text) = render.and_then(|r| r.start_text.as_deref()) {
        text.push_str(start_text);
    }
    text.push_str(ellipsis);
    match render.and_then(|r| r.end_text.as_deref()) {
        Some(end_text) => text.push_str(end_text),
        None => text.push_str(last_line.trim()),
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RecordingRenderer;

    #[test]
    fn test_first_update_renders() {
        let mut renderer = RecordingRenderer::new();
        let mut marker = FoldedLineMarker::new(BufferId(1), 3, 7, "fn a() {".into(), 8);

        assert!(marker.update_virt_text(3, 7, None, false, &mut renderer));
        assert_eq!(renderer.live_count(), 1);

        // Same span and text: no churn.
        assert!(!marker.update_virt_text(3, 7, Some(("fn a() {", 8)), false, &mut renderer));
        assert_eq!(renderer.render_calls(), 1);
    }

    #[test]
    fn test_changed_text_or_force_rerenders() {
        let mut renderer = RecordingRenderer::new();
        let mut marker = FoldedLineMarker::new(BufferId(1), 3, 7, "a".into(), 1);
        marker.update_virt_text(3, 7, None, false, &mut renderer);

        assert!(marker.update_virt_text(3, 7, Some(("ab", 2)), false, &mut renderer));
        assert_eq!(marker.text(), "ab");
        assert!(marker.update_virt_text(3, 7, None, true, &mut renderer));
        assert_eq!(renderer.render_calls(), 3);
        // Old handles are released on each re-render.
        assert_eq!(renderer.live_count(), 1);
    }

    #[test]
    fn test_delete_extmark_is_idempotent() {
        let mut renderer = RecordingRenderer::new();
        let mut marker = FoldedLineMarker::new(BufferId(1), 1, 2, "x".into(), 1);
        marker.update_virt_text(1, 2, None, false, &mut renderer);

        marker.delete_extmark(&mut renderer);
        marker.delete_extmark(&mut renderer);
        assert_eq!(marker.handle(), None);
        assert_eq!(renderer.live_count(), 0);
        assert_eq!(marker.text(), "x");
    }

    #[test]
    fn test_fold_text() {
        assert_eq!(fold_text("  fn main() {  ", "  }", None, " ... "), "  fn main() { ... }");

        let render = RenderMetadata {
            start_text: Some(" /*".into()),
            end_text: Some("*/".into()),
            ..Default::default()
        };
        assert_eq!(fold_text("x", "ignored", Some(&render), "…"), "x /*…*/");
        assert_eq!(display_width("日本"), 4);
    }
}
