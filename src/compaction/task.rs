// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::manager::SegmentManager;
use crate::segment::Segment;
use std::sync::Arc;

/// Opaque handle describing one rewrite: a reference to the manager the
/// group lives in, plus the ordered list of segments to rewrite together.
///
/// This is the only thing the planner hands back to callers (§6). It
/// carries no behavior of its own — an external executor (or, for this
/// crate's own tests and doc examples, [`crate::worker::Executor`])
/// interprets it according to the rewrite task contract (§4.F).
pub struct RewriteTaskDescriptor<'m, M: SegmentManager> {
    /// The manager this task's segments belong to.
    pub manager: &'m M,

    /// The group to rewrite, in ascending index order.
    pub group: Vec<Arc<M::Segment>>,
}

impl<'m, M: SegmentManager> RewriteTaskDescriptor<'m, M> {
    fn new(manager: &'m M, group: Vec<Arc<M::Segment>>) -> Self {
        Self { manager, group }
    }

    /// `id` the rewritten segment will carry: the first group member's id.
    #[must_use]
    pub fn target_id(&self) -> crate::descriptor::SegmentId {
        self.group
            .first()
            .expect("a task is never built from an empty group")
            .descriptor()
            .id
    }

    /// `version` the rewritten segment will carry: first member's version + 1.
    #[must_use]
    pub fn target_version(&self) -> crate::descriptor::Version {
        self.group
            .first()
            .expect("a task is never built from an empty group")
            .descriptor()
            .version
            + 1
    }

    /// Sum of live entries across the group — the minimum capacity the
    /// rewrite target must hold (§4.F step 1).
    #[must_use]
    pub fn live_entry_count(&self) -> usize {
        self.group
            .iter()
            .map(|s| s.count() - s.clean_count())
            .sum()
    }

    /// Largest slot-capacity tier represented in the group (Open Question
    /// (c): the rewrite allocates at this tier).
    #[must_use]
    pub fn target_length(&self) -> usize {
        self.group
            .iter()
            .map(|s| s.length())
            .max()
            .expect("a task is never built from an empty group")
    }
}

/// Wraps each group produced by [`crate::compaction::planner::group_cleanable`]
/// into a [`RewriteTaskDescriptor`], in the order the groups were formed
/// (ascending base index). Emits no task for an empty group list.
pub fn build_task_descriptors<M: SegmentManager>(
    manager: &M,
    groups: Vec<Vec<Arc<M::Segment>>>,
) -> Vec<RewriteTaskDescriptor<'_, M>> {
    groups
        .into_iter()
        .map(|group| RewriteTaskDescriptor::new(manager, group))
        .collect()
}
