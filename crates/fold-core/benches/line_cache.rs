use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fold_core::{
    BufferId, EditNotification, FoldRange, FoldState, LineCache, MemoryHost, Position,
    RecordingRenderer, RefreshPolicy, apply_line_edit, canonicalize, normalize_candidates,
};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 48);
    for i in 0..line_count {
        out.push_str(&format!("{i:06}     let value = compute(value, {i});\n"));
    }
    out.pop();
    out
}

fn bench_initial_fetch(c: &mut Criterion) {
    let mut host = MemoryHost::new();
    let id = host.open("rust", &large_text(50_000));

    c.bench_function("line_cache/initial_fetch_50k", |b| {
        b.iter(|| {
            let mut cache = LineCache::new(id, RefreshPolicy::default());
            black_box(cache.lines(&host, 1, -1).map(|l| l.len()).unwrap_or(0));
        })
    });
}

fn bench_scattered_edits(c: &mut Criterion) {
    let text = large_text(50_000);

    c.bench_function("line_cache/100_scattered_edits", |b| {
        b.iter_batched(
            || {
                let mut host = MemoryHost::new();
                let id = host.open("rust", &text);
                let mut cache = LineCache::new(id, RefreshPolicy::default());
                cache.sync(&host);
                (host, id, cache)
            },
            |(mut host, id, mut cache)| {
                for i in 0..100 {
                    let row = i * 497;
                    cache.push_edit(host.replace_lines(id, row..row + 1, &["edited", "edited"]));
                }
                black_box(cache.sync(&host));
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_marker_shift(c: &mut Criterion) {
    let mut renderer = RecordingRenderer::new();
    let mut state = FoldState::new(BufferId(1));
    for lnum in (10..50_000).step_by(100) {
        state
            .close_fold(lnum, lnum + 20, "...", 3, 50_000, &mut renderer)
            .unwrap();
    }

    c.bench_function("fold_state/insert_line_at_top", |b| {
        b.iter(|| {
            black_box(state.handle_folded_lines_changed(0, 0, 1, &mut renderer));
            black_box(state.handle_folded_lines_changed(0, 1, 0, &mut renderer));
        })
    });
}

fn bench_canonicalize(c: &mut Criterion) {
    let candidates: Vec<FoldRange> = (0..20_000)
        .flat_map(|i| {
            let start = i * 3;
            [
                FoldRange::new(Position::new(start, 0), Position::new(start + 2, 1)),
                FoldRange::new(Position::new(start, 4), Position::new(start + 2, 1)),
                FoldRange::new(Position::new(start + 1, 0), Position::new(start + 2, 0)),
            ]
        })
        .filter_map(Result::ok)
        .collect();

    c.bench_function("selector/canonicalize_60k", |b| {
        b.iter_batched(
            || candidates.clone(),
            |candidates| black_box(canonicalize(normalize_candidates(candidates))),
            BatchSize::LargeInput,
        )
    });
}

fn bench_apply_line_edit(c: &mut Criterion) {
    c.bench_function("edit/apply_insert_50k", |b| {
        b.iter_batched(
            || vec![Some(0u32); 50_000],
            |mut rows| {
                let edit = EditNotification::new(25_000, 25_000, 25_010);
                black_box(apply_line_edit(&mut rows, edit));
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_initial_fetch,
    bench_scattered_edits,
    bench_marker_shift,
    bench_canonicalize,
    bench_apply_line_edit
);
criterion_main!(benches);
