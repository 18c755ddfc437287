// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::policy::{cleanable, GroupAccumulator};
use crate::config::StorageConfig;
use crate::segment::Segment;
use std::sync::Arc;

/// Folds an ascending-by-`first_index` stream of segments into adjacent
/// merge-groups, selecting only [`cleanable`] segments and splitting a
/// chain wherever version or physical-index adjacency breaks, or wherever
/// the combined group would no longer fit its largest capacity tier.
///
/// This is the core of the planner (§4.D). It never inspects more than the
/// immediately preceding segment: grouping is a single left-to-right fold,
/// not a search, so a planning pass is `O(n)` in the number of segments.
///
/// Branch order matters: version/adjacency compatibility is checked before
/// capacity, because crossing either would produce a structurally invalid
/// group even if the sizes happened to "fit" (§4.D rationale).
pub fn group_cleanable<S: Segment>(
    segments: &[Arc<S>],
    commit_index: u64,
    storage: &impl StorageConfig,
) -> Vec<Vec<Arc<S>>> {
    let mut groups: Vec<Vec<Arc<S>>> = Vec::new();
    let mut current: Vec<Arc<S>> = Vec::new();
    let mut acc: Option<GroupAccumulator> = None;

    for s in segments {
        if !cleanable(s.as_ref(), commit_index, storage) {
            log::trace!(
                "segment {} not cleanable, skipping",
                s.descriptor().id
            );
            continue;
        }

        match &mut acc {
            Some(a) if a.feasible(s.as_ref()) => {
                current.push(Arc::clone(s));
                a.absorb(s.as_ref());
            }
            Some(_) => {
                log::debug!(
                    "closing group of {} segment(s) at segment {}",
                    current.len(),
                    s.descriptor().id
                );
                groups.push(std::mem::take(&mut current));
                current.push(Arc::clone(s));
                acc = Some(GroupAccumulator::start(s.as_ref()));
            }
            None => {
                current.push(Arc::clone(s));
                acc = Some(GroupAccumulator::start(s.as_ref()));
            }
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }

    log::debug!("planning pass produced {} group(s)", groups.len());

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistedConfig;
    use crate::segment::MemSegment;
    use std::sync::Arc;

    fn storage() -> PersistedConfig {
        PersistedConfig::default()
    }

    fn ids(groups: &[Vec<Arc<MemSegment>>]) -> Vec<Vec<u64>> {
        groups
            .iter()
            .map(|g| g.iter().map(|s| s.descriptor().id).collect())
            .collect()
    }

    #[test]
    fn scenario_1_hot_singleton() {
        let segs = vec![
            Arc::new(MemSegment::new(1, 1, 1, 100, 100, 60, true)),
            Arc::new(MemSegment::new(2, 1, 101, 200, 100, 10, true)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1]]);
    }

    #[test]
    fn scenario_2_sparse_merge() {
        let segs = vec![
            Arc::new(MemSegment::new(1, 2, 1, 100, 40, 0, true)),
            Arc::new(MemSegment::new(2, 2, 101, 200, 30, 0, true)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1, 2]]);
    }

    #[test]
    fn scenario_3_version_mismatch_splits() {
        let segs = vec![
            Arc::new(MemSegment::new(1, 1, 1, 100, 40, 0, true)),
            Arc::new(MemSegment::new(2, 2, 101, 200, 30, 0, true)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1], vec![2]]);
    }

    #[test]
    fn scenario_4_index_gap_splits() {
        let segs = vec![
            Arc::new(MemSegment::new(1, 1, 1, 100, 40, 0, true)),
            Arc::new(MemSegment::new(2, 1, 200, 300, 30, 0, true)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1], vec![2]]);
    }

    #[test]
    fn scenario_5_oversized_merge_splits() {
        let segs = vec![
            Arc::new(MemSegment::new(1, 1, 1, 100, 60, 0, true)),
            Arc::new(MemSegment::new(2, 1, 101, 200, 60, 0, true)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1], vec![2]]);
    }

    #[test]
    fn scenario_6_uncommitted_segment_excluded() {
        let segs = vec![Arc::new(MemSegment::new(1, 1, 1, 100, 100, 50, true))];
        let groups = group_cleanable(&segs, 50, &storage());
        assert!(groups.is_empty());
    }

    #[test]
    fn zero_count_segment_joins_trivially() {
        let segs = vec![
            Arc::new(MemSegment::new(1, 2, 1, 100, 40, 0, true)),
            Arc::new(MemSegment::new(2, 2, 101, 200, 0, 0, true)),
            Arc::new(MemSegment::new(3, 2, 201, 300, 30, 0, true)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn non_cleanable_segments_are_skipped_without_breaking_adjacency() {
        // Segment 2 is not cleanable; segments 1 and 3 are not physically
        // adjacent to each other, so they must not be merged together even
        // though segment 2 sits between them in enumeration order.
        let segs = vec![
            Arc::new(MemSegment::new(1, 2, 1, 100, 40, 0, true)),
            Arc::new(MemSegment::new(2, 2, 101, 200, 90, 5, true)), // not cleanable
            Arc::new(MemSegment::new(3, 2, 201, 300, 30, 0, true)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1], vec![3]]);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let segs: Vec<Arc<MemSegment>> = vec![];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert!(groups.is_empty());
    }

    #[test]
    fn differing_length_tiers_use_max_of_the_group_so_far_as_ceiling() {
        // The ceiling is max{length(g) : g in G} over the already-selected
        // group only; a candidate's own (larger) length must not widen it.
        // Both segments are individually cleanable via the sparse fast path
        // (20 < 50/2, 45 < 100/2). 20 + 45 = 65, which is not < max{50} = 50
        // (the group-so-far's only member), so this must split even though
        // the candidate's own length of 100 would have let it through.
        let segs = vec![
            Arc::new(MemSegment::new(1, 2, 1, 50, 20, 0, true).with_length(50)),
            Arc::new(MemSegment::new(2, 2, 51, 150, 45, 0, true).with_length(100)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1], vec![2]]);
    }

    #[test]
    fn a_later_candidates_length_does_not_widen_the_ceiling() {
        // Distinguishes "max over the group so far" from "max including the
        // candidate": first member length 50 (count 20, sparse), candidate
        // length 100 (count 35, sparse). Under the correct reading,
        // 20 + 35 = 55 is not < max{50} = 50, so this must split. Under the
        // wrong reading (max(50, 100) = 100), 55 < 100 would wrongly merge.
        let segs = vec![
            Arc::new(MemSegment::new(1, 2, 1, 50, 20, 0, true).with_length(50)),
            Arc::new(MemSegment::new(2, 2, 51, 150, 35, 0, true).with_length(100)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1], vec![2]]);
    }

    #[test]
    fn a_later_candidates_larger_length_still_absorbs_for_the_next_member() {
        // Once a larger-length candidate *does* join feasibly, its length
        // becomes part of the ceiling for whichever segment comes after it.
        // first: length 50, count 20. second: length 100, count 20 (joins:
        // 20+20=40 < max{50}=50). third: length 100, count 40 (joins:
        // 40+40=80 < max{50,100}=100, using the now-absorbed ceiling).
        let segs = vec![
            Arc::new(MemSegment::new(1, 2, 1, 50, 20, 0, true).with_length(50)),
            Arc::new(MemSegment::new(2, 2, 51, 150, 20, 0, true).with_length(100)),
            Arc::new(MemSegment::new(3, 2, 151, 250, 40, 0, true).with_length(100)),
        ];
        let groups = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&groups), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn idempotent_across_repeated_planning_passes() {
        let segs = vec![
            Arc::new(MemSegment::new(1, 2, 1, 100, 40, 0, true)),
            Arc::new(MemSegment::new(2, 2, 101, 200, 30, 0, true)),
        ];
        let first = group_cleanable(&segs, 1000, &storage());
        let second = group_cleanable(&segs, 1000, &storage());
        assert_eq!(ids(&first), ids(&second));
    }
}
