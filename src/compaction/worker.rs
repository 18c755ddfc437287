// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::task::RewriteTaskDescriptor;
use crate::error::{Error, Result};
use crate::manager::MemSegmentManager;
use crate::segment::{MemSegment, Segment};

/// Reference implementation of the rewrite task contract (§4.F) against
/// [`MemSegmentManager`].
///
/// This is not a model for how the real segment store would perform a
/// rewrite (that involves the on-disk format, an explicit external
/// collaborator per the crate's scope). It exists so the contract can be
/// exercised end to end in tests: build a task, execute it, observe the
/// manager reflect the swap.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor {
    inject_failure: Option<InjectedFailure>,
}

#[derive(Debug, Clone, Copy)]
enum InjectedFailure {
    InsufficientSpace,
    CorruptSegment,
}

/// Summary of what an [`Executor::execute`] call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Number of old segments that were consumed by the rewrite.
    pub segments_consumed: usize,
    /// `id` of the newly written segment.
    pub new_segment_id: crate::descriptor::SegmentId,
    /// `version` of the newly written segment.
    pub new_segment_version: crate::descriptor::Version,
    /// Live entries carried over into the new segment.
    pub live_entries: usize,
}

impl Executor {
    /// A plain executor with no injected failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an executor that fails every `execute` call with the given
    /// kind, for exercising the "a failed task leaves the old group intact"
    /// contract (§4.F, §7) without a real I/O fault.
    #[must_use]
    pub fn with_injected_insufficient_space() -> Self {
        Self {
            inject_failure: Some(InjectedFailure::InsufficientSpace),
        }
    }

    /// As above, but simulates a fatal `CorruptSegment` condition.
    #[must_use]
    pub fn with_injected_corrupt_segment() -> Self {
        Self {
            inject_failure: Some(InjectedFailure::CorruptSegment),
        }
    }

    /// Executes one rewrite task (§4.F):
    ///
    /// 1. Allocates the replacement segment (`id` = first member's `id`,
    ///    `version` = first member's `version + 1`, capacity the task's
    ///    [`RewriteTaskDescriptor::target_length`]).
    /// 2. "Copies" live entries — here just the summed count, since
    ///    physical entry layout is out of scope for this crate.
    /// 3. Atomically swaps the replacement in via
    ///    [`MemSegmentManager::swap_group`].
    ///
    /// On failure (real or injected) the manager is left untouched: the
    /// group's segments simply reappear as eligible input to the next
    /// planning pass.
    pub fn execute(&self, task: &RewriteTaskDescriptor<'_, MemSegmentManager>) -> Result<RewriteOutcome> {
        log::trace!(
            "executor: acquiring segment manager for group of {} segment(s)",
            task.group.len()
        );

        if let Some(failure) = self.inject_failure {
            log::debug!("executor: simulating injected failure {failure:?}");
            return Err(match failure {
                InjectedFailure::InsufficientSpace => Error::InsufficientSpace {
                    needed: task.live_entry_count(),
                    available: task.target_length(),
                },
                InjectedFailure::CorruptSegment => {
                    Error::CorruptSegment(format!("segment {}", task.target_id()))
                }
            });
        }

        let live_entries = task.live_entry_count();
        let target_length = task.target_length();

        if live_entries >= target_length {
            log::debug!(
                "executor: rewrite target too small ({live_entries} >= {target_length})"
            );
            return Err(Error::InsufficientSpace {
                needed: live_entries,
                available: target_length,
            });
        }

        let first = task.group.first().expect("group is non-empty");
        let last = task.group.last().expect("group is non-empty");

        let replacement = MemSegment::new(
            task.target_id(),
            task.target_version(),
            first.first_index(),
            last.last_index(),
            live_entries,
            0,
            true,
        )
        .with_length(target_length)
        .with_compacted(true);

        task.manager.swap_group(&task.group, replacement);

        log::debug!(
            "executor: rewrote {} segment(s) into id {} v{}",
            task.group.len(),
            task.target_id(),
            task.target_version()
        );

        Ok(RewriteOutcome {
            segments_consumed: task.group.len(),
            new_segment_id: task.target_id(),
            new_segment_version: task.target_version(),
            live_entries,
        })
    }
}
