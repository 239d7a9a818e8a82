//! Fold candidates from structural query matches.

use crate::config::FoldConfig;
use crate::error::{FoldError, FoldResult};
use crate::query::{NodeSpan, QueryMatch, StructuralQuery};
use crate::range::{FoldKind, FoldRange, RenderMetadata};

/// Turns structural query matches into raw fold candidates.
#[derive(Debug, Clone)]
pub struct RangeCandidateSource {
    query_name: String,
    capture_name: String,
    default_priority: i32,
}

impl RangeCandidateSource {
    /// Create a source using the query/capture names from `config`.
    pub fn new(config: &FoldConfig) -> Self {
        Self {
            query_name: config.query_name.clone(),
            capture_name: config.capture_name.clone(),
            default_priority: config.default_priority,
        }
    }

    /// Returns the root layer's language if it has no fold query, or `""` if there are no layers.
    pub fn unsupported_language(&self, engine: &dyn StructuralQuery) -> Option<String> {
        match engine.layers().into_iter().next() {
            Some(root) if engine.has_query(&root.language, &self.query_name) => None,
            Some(root) => Some(root.language),
            None => Some(String::new()),
        }
    }

    /// Collect candidates from every language layer of `engine`.
    ///
    /// Injected layers whose language has no fold query contribute nothing. Fails with
    /// [`FoldError::Fallback`] if the root layer has no fold query (or there are no layers), and
    /// with [`FoldError::MalformedRange`] if the engine reports a backward span.
    pub fn candidates(&self, engine: &dyn StructuralQuery) -> FoldResult<Vec<FoldRange>> {
        let layers = engine.layers();
        match layers.first() {
            None => {
                return Err(FoldError::Fallback {
                    language: String::new(),
                });
            }
            Some(root) if !engine.has_query(&root.language, &self.query_name) => {
                return Err(FoldError::Fallback {
                    language: root.language.clone(),
                });
            }
            Some(_) => {}
        }

        let mut out = Vec::new();
        for layer in &layers {
            if !engine.has_query(&layer.language, &self.query_name) {
                tracing::trace!(language = %layer.language, "no fold query for injected layer");
                continue;
            }

            let matches = engine.run_query(layer, &self.query_name, layer.query_rows());
            for m in &matches {
                self.collect_match(m, &mut out)?;
            }
        }

        tracing::trace!(layers = layers.len(), candidates = out.len(), "collected fold candidates");
        Ok(out)
    }

    fn collect_match(&self, m: &QueryMatch, out: &mut Vec<FoldRange>) -> FoldResult<()> {
        let priority = m
            .property("priority")
            .and_then(|p| p.trim().parse::<i32>().ok())
            .unwrap_or(self.default_priority);
        let kind = m
            .property("kind")
            .map(FoldKind::from_name)
            .unwrap_or_default();
        let render = RenderMetadata {
            start_text: m.property("startText").map(str::to_string),
            start_highlight: m.property("startHighlight").map(str::to_string),
            end_text: m.property("endText").map(str::to_string),
            end_highlight: m.property("endHighlight").map(str::to_string),
        };

        let build = |span: &NodeSpan| -> FoldResult<FoldRange> {
            Ok(FoldRange::new(span.start, span.end)?
                .with_kind(kind)
                .with_priority(priority)
                .with_render(render.clone()))
        };

        for capture in &m.captures {
            if capture.name == self.capture_name {
                out.push(build(&capture.span)?);
            }
        }
        if let Some(span) = m.range.as_ref() {
            out.push(build(span)?);
        }
        Ok(())
    }
}

/// Trim column-0 ends and drop single-line candidates.
pub fn normalize_candidates(candidates: Vec<FoldRange>) -> Vec<FoldRange> {
    candidates.into_iter().filter_map(FoldRange::trimmed).collect()
}
