//! Canonical fold set selection.
//!
//! Several query patterns often report the same fold with slightly different spans (a function
//! item and its body block, for instance). Candidates are grouped by their `(start_line,
//! end_line)` pair and each group is reduced to its most specific member.

use crate::range::FoldRange;
use std::collections::HashMap;

/// Reduce a group of candidates to the smallest enclosed one.
///
/// The first candidate seeds the running best. A later candidate replaces it only when the best
/// encloses it and the spans differ, so equal spans keep the first one seen.
pub fn select_smallest<'a, I>(candidates: I) -> Option<&'a FoldRange>
where
    I: IntoIterator<Item = &'a FoldRange>,
{
    let mut best: Option<&FoldRange> = None;
    for candidate in candidates {
        best = match best {
            None => Some(candidate),
            Some(b) if b.includes(candidate) && !b.same_span(candidate) => Some(candidate),
            keep => keep,
        };
    }
    best
}

/// Deduplicate candidates per line pair and sort them.
///
/// Output order is `(start_line, end_line, start_column)` ascending, with at most one range per
/// `(start_line, end_line)` pair.
pub fn canonicalize(candidates: Vec<FoldRange>) -> Vec<FoldRange> {
    let mut groups: HashMap<(usize, usize), Vec<FoldRange>> = HashMap::new();
    for candidate in candidates {
        groups.entry(candidate.line_pair()).or_default().push(candidate);
    }

    let mut out: Vec<FoldRange> = groups
        .values()
        .filter_map(|group| select_smallest(group).cloned())
        .collect();
    out.sort_by_key(|r| (r.start.line, r.end.line, r.start.column));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{FoldKind, Position};
    use pretty_assertions::assert_eq;

    fn range(sl: usize, sc: usize, el: usize, ec: usize) -> FoldRange {
        FoldRange::new(Position::new(sl, sc), Position::new(el, ec)).unwrap()
    }

    #[test]
    fn test_smaller_span_wins_within_group() {
        let outer = range(1, 0, 5, 3);
        let inner = range(1, 4, 5, 1);
        let out = canonicalize(vec![outer, inner.clone()]);
        assert_eq!(out, vec![inner]);
    }

    #[test]
    fn test_non_enclosed_later_candidate_is_ignored() {
        let first = range(1, 0, 5, 0).with_kind(FoldKind::Region);
        let second = range(1, 0, 5, 3).with_kind(FoldKind::Region);
        let out = canonicalize(vec![first.clone(), second]);
        assert_eq!(out, vec![first]);
    }

    #[test]
    fn test_equal_spans_keep_first_seen() {
        let first = range(2, 0, 6, 1).with_priority(1);
        let second = range(2, 0, 6, 1).with_priority(2);
        let out = canonicalize(vec![first, second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].priority, 1);
    }

    #[test]
    fn test_output_is_sorted_and_unique_per_line_pair() {
        let out = canonicalize(vec![
            range(10, 0, 12, 1),
            range(0, 4, 20, 1),
            range(0, 0, 5, 1),
            range(3, 2, 4, 0),
            range(0, 0, 20, 1),
            range(3, 2, 4, 9),
        ]);

        let keys: Vec<_> = out
            .iter()
            .map(|r| (r.start.line, r.end.line, r.start.column))
            .collect();
        assert_eq!(keys, vec![(0, 5, 0), (0, 20, 4), (3, 4, 2), (10, 12, 0)]);
    }

    #[test]
    fn test_canonicalize_agrees_with_select_smallest() {
        let group = vec![
            range(4, 0, 9, 9),
            range(4, 6, 9, 1),
            range(4, 2, 9, 5),
            range(4, 6, 9, 1).with_priority(3),
        ];
        let out = canonicalize(group.clone());
        assert_eq!(out.len(), 1);
        assert_eq!(Some(&out[0]), select_smallest(&group));
        assert_eq!(out[0].priority, 0);
    }

    #[test]
    fn test_select_smallest_over_installed_set() {
        let ranges = vec![range(1, 0, 5, 9), range(1, 2, 5, 3), range(1, 1, 5, 4)];
        let best = select_smallest(ranges.iter()).unwrap();
        assert_eq!(best, &ranges[1]);
        assert_eq!(select_smallest(std::iter::empty()), None);
    }
}
