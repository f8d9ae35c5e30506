//! Error taxonomy shared by every stage of a selection run.
//!
//! Each variant names the stage (and where it applies the list, row and
//! variable) that triggered it, so a caller can point at the offending input.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage at which an error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Profile,
    Records,
    PoolBuild,
    Scoring,
    Search,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Profile => "profile",
            Stage::Records => "records",
            Stage::PoolBuild => "pool build",
            Stage::Scoring => "scoring",
            Stage::Search => "search",
        };
        f.write_str(name)
    }
}

/// Which input list a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Candidates,
    AlwaysInclude,
    Veto,
    Sample,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListKind::Candidates => "candidate list",
            ListKind::AlwaysInclude => "always-include list",
            ListKind::Veto => "veto list",
            ListKind::Sample => "sample",
        };
        f.write_str(name)
    }
}

/// Why the eligible pool cannot support the requested sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolShortfall {
    #[error("always-include list has {always} individuals but the sample size is {sample_size}")]
    AlwaysIncludeExceedsSample { always: usize, sample_size: usize },

    #[error("{needed} candidates must be drawn but only {available} are eligible")]
    TooFewCandidates { needed: usize, available: usize },

    #[error("iteration budget is zero, no sample would be evaluated")]
    NoIterations,

    #[error("sample size is zero")]
    EmptySample,
}

/// Errors raised by the selection core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SortitionError {
    #[error("data shape error ({stage}): {detail}")]
    DataShape { stage: Stage, detail: String },

    #[error("age {age} in {list} row {row} is not covered by any age band (lowest band starts at {lowest})")]
    OutOfRangeAge {
        list: ListKind,
        row: usize,
        age: f64,
        lowest: u32,
    },

    #[error("insufficient pool: {0}")]
    InsufficientPool(PoolShortfall),

    #[error("variable '{variable}' has {scoreable} scoreable categories, at least 2 are required")]
    DegenerateVariable { variable: String, scoreable: usize },
}

impl SortitionError {
    pub fn data_shape(stage: Stage, detail: impl Into<String>) -> Self {
        Self::DataShape {
            stage,
            detail: detail.into(),
        }
    }

    /// Stage the error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::DataShape { stage, .. } => *stage,
            Self::OutOfRangeAge { .. } => Stage::Records,
            Self::InsufficientPool(PoolShortfall::NoIterations) => Stage::Search,
            Self::InsufficientPool(_) => Stage::PoolBuild,
            Self::DegenerateVariable { .. } => Stage::Scoring,
        }
    }
}

pub type Result<T> = std::result::Result<T, SortitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = SortitionError::OutOfRangeAge {
            list: ListKind::Veto,
            row: 3,
            age: 17.0,
            lowest: 18,
        };
        let msg = err.to_string();
        assert!(msg.contains("veto list"));
        assert!(msg.contains("row 3"));
        assert!(msg.contains("17"));
    }

    #[test]
    fn stage_is_derived_from_variant() {
        assert_eq!(
            SortitionError::InsufficientPool(PoolShortfall::NoIterations).stage(),
            Stage::Search
        );
        assert_eq!(
            SortitionError::InsufficientPool(PoolShortfall::TooFewCandidates {
                needed: 5,
                available: 2
            })
            .stage(),
            Stage::PoolBuild
        );
        assert_eq!(
            SortitionError::DegenerateVariable {
                variable: "Køn".into(),
                scoreable: 1
            }
            .stage(),
            Stage::Scoring
        );
    }
}
