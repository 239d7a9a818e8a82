use fold_core::{
    FoldConfig, FoldRegistry, LanguageLayer, MemoryHost, NodeSpan, Position, QueryMatch,
    RecordingRenderer, StructuralQuery,
};
use std::ops::Range;

/// Reports a fold for every `{ ... }` block spanning more than one line.
struct BraceQuery {
    text: String,
}

impl StructuralQuery for BraceQuery {
    fn layers(&self) -> Vec<LanguageLayer> {
        let last = self.text.lines().count().saturating_sub(1);
        vec![LanguageLayer::new("rust", 0, last)]
    }

    fn has_query(&self, _language: &str, query_name: &str) -> bool {
        query_name == "folds"
    }

    fn run_query(
        &self,
        _layer: &LanguageLayer,
        _query_name: &str,
        rows: Range<usize>,
    ) -> Vec<QueryMatch> {
        let mut open = Vec::new();
        let mut out = Vec::new();
        for (row, line) in self.text.lines().enumerate().skip(rows.start).take(rows.len()) {
            for (col, ch) in line.char_indices() {
                match ch {
                    '{' => open.push(Position::new(row, col)),
                    '}' => {
                        if let Some(start) = open.pop() {
                            let span = NodeSpan::new(start, Position::new(row, col + 1));
                            out.push(QueryMatch::new().with_capture("fold", span));
                        }
                    }
                    _ => {}
                }
            }
        }
        out
    }
}

fn main() {
    let mut host = MemoryHost::new();
    let text = "fn main() {\n    if ready {\n        go();\n    }\n}\n";
    let id = host.open("rust", text);
    let mut renderer = RecordingRenderer::new();
    let mut registry = FoldRegistry::new(FoldConfig::default());

    let engine = BraceQuery {
        text: text.to_string(),
    };
    let ranges = registry
        .get_folds(&host, id, &engine, &mut renderer)
        .unwrap()
        .unwrap_or_default();
    for range in &ranges {
        println!("fold {}..={}", range.start_line(), range.end_line());
    }

    registry.close_fold_at(&host, id, 1, &mut renderer).unwrap();
    for marker in renderer.live() {
        println!("closed {}-{}: {}", marker.line, marker.end_line, marker.text);
    }

    // A newline above the fold moves the marker down.
    let edit = host.replace_lines(id, 0..0, &["use std::io;"]);
    registry.notify_edit(id, edit, &mut renderer);
    for marker in renderer.live() {
        println!("closed {}-{}: {}", marker.line, marker.end_line, marker.text);
    }
}
