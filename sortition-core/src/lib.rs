//! Sortition core: domain types and pure logic for representative panel selection.
//!
//! This crate contains the optimizer's building blocks:
//! - Population profile (target category fractions per variable)
//! - Age bands derived from the profile and age categorisation
//! - Row digests used as deduplication keys across lists
//! - Typed individuals built from tabular rows
//! - Candidate pool assembly with veto and always-include exclusion
//! - Chi-square based representativeness scoring
//! - Deterministic per-iteration RNG derivation
//!
//! Nothing here performs I/O; loading and the search loop live in
//! `sortition-runner`.

pub mod age;
pub mod digest;
pub mod error;
pub mod pool;
pub mod profile;
pub mod record;
pub mod rng;
pub mod score;

pub use age::{AgeBand, AgeBandSet, AgeOutOfRange};
pub use digest::RowDigest;
pub use error::{ListKind, PoolShortfall, Result, SortitionError, Stage};
pub use pool::{CandidatePool, CandidatePoolBuilder, PoolBuild, PoolSummary};
pub use profile::{
    CategoryShare, PopulationProfile, ProfileRow, VariableProfile, DEFAULT_FRACTION_TOLERANCE,
};
pub use record::{Individual, RawTable, RecordSchema};
pub use rng::DrawSeeds;
pub use score::{score, DegeneratePolicy, Scorer, VariableScore};
