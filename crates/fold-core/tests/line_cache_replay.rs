use fold_core::{
    BufferHost, CacheRefresh, EditNotification, LineCache, MemoryHost, RefreshPolicy,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn numbered(n: usize) -> String {
    (1..=n)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn host_lines(host: &MemoryHost, id: fold_core::BufferId) -> Vec<String> {
    host.get_lines(id, 0..host.line_count(id))
}

#[test]
fn test_no_edits_matches_direct_fetch() {
    let mut host = MemoryHost::new();
    let id = host.open("rust", &numbered(25));
    let mut cache = LineCache::new(id, RefreshPolicy::default());

    let first: Vec<String> = cache
        .lines(&host, 1, -1)
        .unwrap()
        .into_iter()
        .map(str::to_string)
        .collect();
    let second: Vec<String> = cache
        .lines(&host, 1, -1)
        .unwrap()
        .into_iter()
        .map(str::to_string)
        .collect();

    assert_eq!(first, host_lines(&host, id));
    assert_eq!(second, first);
    assert_eq!(cache.last_refresh(), Some(CacheRefresh::Clean));
}

#[test]
fn test_deleting_a_row_shrinks_cache() {
    let mut host = MemoryHost::new();
    let id = host.open("rust", &numbered(10));
    let mut cache = LineCache::new(id, RefreshPolicy::default());
    cache.sync(&host);

    // Rows 2..4 collapse into a single rewritten row 2.
    let edit = host.replace_lines(id, 2..4, &["merged"]);
    assert_eq!(edit, EditNotification::new(2, 4, 3));
    cache.push_edit(edit);

    let lines: Vec<String> = cache
        .lines(&host, 1, 9)
        .unwrap()
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(cache.line_count(), 9);
    assert_eq!(lines, host_lines(&host, id));
    assert_eq!(lines[2], "merged");
    assert_eq!(lines[3], "line 5");
}

#[test]
fn test_edits_queue_until_read() {
    let mut host = MemoryHost::new();
    let id = host.open("rust", &numbered(6));
    let mut cache = LineCache::new(id, RefreshPolicy::default());
    cache.sync(&host);

    cache.push_edit(host.replace_lines(id, 0..0, &["header"]));
    cache.push_edit(host.replace_lines(id, 3..5, &[]));
    cache.push_edit(host.replace_lines(id, 4..4, &["a", "b"]));
    assert_eq!(cache.pending_edits(), 3);

    let lines: Vec<String> = cache
        .lines(&host, 1, -1)
        .unwrap()
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(cache.pending_edits(), 0);
    assert_eq!(lines, host_lines(&host, id));
}

#[test]
fn test_pure_deletion_needs_no_refetch() {
    let mut host = MemoryHost::new();
    let id = host.open("rust", &numbered(8));
    let mut cache = LineCache::new(id, RefreshPolicy::default());
    cache.sync(&host);

    cache.push_edit(host.replace_lines(id, 2..5, &[]));
    assert_eq!(cache.sync(&host), CacheRefresh::Clean);
    assert_eq!(
        cache.lines(&host, 1, -1).unwrap(),
        vec!["line 1", "line 2", "line 6", "line 7", "line 8"]
    );
}

#[test]
fn test_custom_policy_prefers_hunks() {
    let mut host = MemoryHost::new();
    let id = host.open("rust", &numbered(10));
    let policy = RefreshPolicy {
        max_missing_ratio: 1.0,
        max_hunks: usize::MAX,
    };
    let mut cache = LineCache::new(id, policy);
    cache.sync(&host);

    for row in [0, 3, 6, 9] {
        cache.push_edit(host.replace_lines(id, row..row + 1, &["x"]));
    }
    assert_eq!(cache.sync(&host), CacheRefresh::Hunks(4));
}

#[test]
fn test_random_edits_round_trip() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for round in 0..40 {
        let mut host = MemoryHost::new();
        let id = host.open("rust", &numbered(rng.gen_range(1..60)));
        // Never refetch wholesale, so the cache content comes from replay plus hunks only.
        let hunks_only = RefreshPolicy {
            max_missing_ratio: 1.0,
            max_hunks: usize::MAX,
        };
        let mut cache = LineCache::new(id, hunks_only);
        cache.sync(&host);

        let mut counter = 0usize;
        for _ in 0..rng.gen_range(1..12) {
            let n = host.line_count(id);
            let first = rng.gen_range(0..=n);
            let last = rng.gen_range(first..=n);
            let inserted: Vec<String> = (0..rng.gen_range(0..4))
                .map(|_| {
                    counter += 1;
                    format!("new {round}.{counter}")
                })
                .collect();
            let inserted: Vec<&str> = inserted.iter().map(String::as_str).collect();
            cache.push_edit(host.replace_lines(id, first..last, &inserted));
        }

        let cached: Vec<String> = cache
            .lines(&host, 1, -1)
            .unwrap()
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(cached, host_lines(&host, id), "round {round}");
        assert!(
            matches!(
                cache.last_refresh(),
                Some(CacheRefresh::Hunks(_) | CacheRefresh::Clean)
            ),
            "round {round}: {:?}",
            cache.last_refresh()
        );
    }
}
