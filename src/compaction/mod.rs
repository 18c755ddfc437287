// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The minor compaction planner: selects which segments to rewrite on a
//! periodic tick, and how to group adjacent segments for merging.
//!
//! [`build_tasks`] is the planner's one external operation (§6). Everything
//! else in this module is internal machinery it is built from:
//! [`policy`] (the per-segment eligibility/cleanability predicates and the
//! merge-feasibility test), [`planner`] (the grouping fold), and [`task`]
//! (wrapping groups into [`task::RewriteTaskDescriptor`]s). [`worker`] is
//! additive scaffolding: a reference executor that honors the rewrite task
//! contract (§4.F) against the in-memory reference segment store, so the
//! contract has something to run against without a real file format.

pub mod planner;
pub mod policy;
pub mod task;
pub mod worker;

pub use task::RewriteTaskDescriptor;
pub use worker::{Executor, RewriteOutcome};

use crate::config::StorageConfig;
use crate::manager::SegmentManager;

/// Builds the ordered list of rewrite task descriptors for one planning
/// pass (§6): `buildTasks(storage, segmentManager) -> [RewriteTaskDescriptor]`.
///
/// Reads a snapshot of `manager.segments()` and `manager.commit_index()`,
/// groups the cleanable ones (§4.C, §4.D), and wraps each group into a task
/// (§4.E). Pure and stateless: the planner retains nothing across calls.
///
/// If the manager's segment list is not actually sorted by ascending
/// `first_index` (a contract violation on the manager's part, §7), the
/// version/adjacency check in the grouping fold breaks on every step and
/// the planner degrades to producing only singleton groups — correctness
/// is preserved, just without any merging.
pub fn build_tasks<'m, M: SegmentManager>(
    storage: &impl StorageConfig,
    manager: &'m M,
) -> Vec<RewriteTaskDescriptor<'m, M>> {
    let segments = manager.segments();
    let commit_index = manager.commit_index();

    if !is_sorted_by_first_index(&segments) {
        log::warn!("segment manager returned a non-monotonic segment list; degrading to singleton groups");
    }

    let groups = planner::group_cleanable(&segments, commit_index, storage);

    log::debug!(
        "planning pass: {} segment(s) examined, {} group(s) selected",
        segments.len(),
        groups.len()
    );

    task::build_task_descriptors(manager, groups)
}

fn is_sorted_by_first_index<S: crate::segment::Segment>(
    segments: &[std::sync::Arc<S>],
) -> bool {
    segments
        .windows(2)
        .all(|pair| pair[0].first_index() <= pair[1].first_index())
}
