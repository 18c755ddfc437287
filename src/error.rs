// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::fmt;

/// Errors that can occur while a [`crate::compaction::Executor`] processes a
/// rewrite task.
///
/// The planner itself (`build_tasks`) never produces an `Error` — it only
/// reads immutable segment state (see crate docs, "Error handling").
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Underlying I/O failure while allocating or swapping a segment.
    Io(std::io::Error),

    /// The destination could not hold the combined live entries of the group.
    ///
    /// Recoverable: the group's segments are returned to the eligible set on
    /// the next planning pass.
    InsufficientSpace {
        /// Live entries that needed to fit.
        needed: usize,
        /// Capacity actually available at the target tier.
        available: usize,
    },

    /// A segment in the group failed consistency checks (e.g. an incomplete
    /// descriptor footer was detected on recovery).
    ///
    /// Fatal for that segment, but still treated as transient by the
    /// planner: it will simply reappear in the next pass once repaired or
    /// replaced out of band.
    CorruptSegment(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error during rewrite: {e}"),
            Self::InsufficientSpace { needed, available } => write!(
                f,
                "rewrite target too small: needed {needed} live entries, only {available} available"
            ),
            Self::CorruptSegment(msg) => write!(f, "corrupt segment: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::InsufficientSpace { .. } | Self::CorruptSegment(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Crate-wide result alias, following the same convention as the storage
/// engine this crate's compaction machinery is modeled on.
pub type Result<T> = std::result::Result<T, Error>;
