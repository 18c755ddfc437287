// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::descriptor::Index;
use crate::segment::{MemSegment, Segment};
use std::sync::{Arc, RwLock};

/// The directory-index side of the segment store, as seen by the planner.
///
/// Persisted state belongs entirely to implementors of this trait; the
/// planner is stateless across invocations and only ever calls
/// [`SegmentManager::segments`] and [`SegmentManager::commit_index`] once
/// per planning pass (see "Concurrency & resource model").
pub trait SegmentManager {
    /// Concrete segment type this manager hands out.
    type Segment: Segment;

    /// All extant segments, sorted by ascending `first_index()`.
    ///
    /// Must return a consistent snapshot for the duration of one planning
    /// pass; the caller guarantees no concurrent truncation or sealing of
    /// the segments being examined runs while this snapshot is alive.
    fn segments(&self) -> Vec<Arc<Self::Segment>>;

    /// Highest Raft-committed log index known locally.
    fn commit_index(&self) -> Index;
}

/// A minimal in-memory [`SegmentManager`], holding its segment list behind
/// an `RwLock` the same way the level manifest this is modeled on guards
/// its own segment list: readers take a read guard for the snapshot,
/// mutation (here, only [`MemSegmentManager::swap_group`]) takes a write
/// guard.
pub struct MemSegmentManager {
    segments: RwLock<Vec<Arc<MemSegment>>>,
    commit_index: RwLock<Index>,
}

impl MemSegmentManager {
    /// Creates a manager from an already ascending-by-`first_index` list of
    /// segments.
    #[must_use]
    pub fn new(segments: Vec<MemSegment>, commit_index: Index) -> Self {
        Self {
            segments: RwLock::new(segments.into_iter().map(Arc::new).collect()),
            commit_index: RwLock::new(commit_index),
        }
    }

    /// Updates the locally known commit index, as the Raft commit tracker
    /// would after replicating further entries.
    pub fn set_commit_index(&self, index: Index) {
        *self.commit_index.write().expect("lock poisoned") = index;
    }

    /// Atomically replaces every segment in `group` with `replacement`
    /// (§4.F step 3: "readers completing the swap see the new segment").
    ///
    /// Segments in `group` not found in the manager are ignored — they may
    /// already have been swapped out by a previous, concurrently-run task
    /// over a disjoint group.
    pub fn swap_group(&self, group: &[Arc<MemSegment>], replacement: MemSegment) {
        let ids: std::collections::HashSet<_> =
            group.iter().map(|s| s.descriptor().id).collect();

        let mut guard = self.segments.write().expect("lock poisoned");

        let insert_at = guard
            .iter()
            .position(|s| ids.contains(&s.descriptor().id))
            .unwrap_or(guard.len());

        guard.retain(|s| !ids.contains(&s.descriptor().id));
        guard.insert(insert_at.min(guard.len()), Arc::new(replacement));

        log::debug!(
            "swapped {} segment(s) for new version at id {}",
            ids.len(),
            group
                .first()
                .map(|s| s.descriptor().id)
                .unwrap_or_default()
        );
    }
}

impl SegmentManager for MemSegmentManager {
    type Segment = MemSegment;

    fn segments(&self) -> Vec<Arc<MemSegment>> {
        self.segments.read().expect("lock poisoned").clone()
    }

    fn commit_index(&self) -> Index {
        *self.commit_index.read().expect("lock poisoned")
    }
}
