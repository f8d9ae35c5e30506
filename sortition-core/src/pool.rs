//! Candidate pool assembly.
//!
//! The eligible pool is the raw candidate list minus every record whose row
//! digest appears in the veto list or in the always-include list. After a
//! build, every individual belongs to exactly one of {pool, always-include,
//! excluded}.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::digest::RowDigest;
use crate::error::{ListKind, PoolShortfall, Result, SortitionError, Stage};
use crate::record::{Individual, RawTable, RecordSchema};

/// Counts describing how the pool was assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub raw_candidates: usize,
    pub always_include: usize,
    pub veto_entries: usize,
    pub removed_by_veto: usize,
    pub removed_as_always_include: usize,
    /// Raw candidate rows whose digest repeats an earlier row.
    pub duplicate_rows: usize,
    pub duplicates_dropped: bool,
    pub eligible: usize,
}

/// Individuals eligible to be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePool {
    individuals: Vec<Individual>,
}

impl CandidatePool {
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    pub fn contains_digest(&self, digest: &RowDigest) -> bool {
        self.individuals.iter().any(|i| i.digest() == *digest)
    }
}

/// Output of a pool build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBuild {
    pub pool: CandidatePool,
    pub always_include: Vec<Individual>,
    pub summary: PoolSummary,
}

impl PoolBuild {
    /// Number of individuals drawn from the pool per sample.
    pub fn draw_size(&self, sample_size: usize) -> usize {
        sample_size.saturating_sub(self.always_include.len())
    }
}

/// Builds the eligible pool from the three raw lists.
#[derive(Debug, Clone)]
pub struct CandidatePoolBuilder<'a> {
    schema: &'a RecordSchema,
    dedupe_pool: bool,
}

impl<'a> CandidatePoolBuilder<'a> {
    pub fn new(schema: &'a RecordSchema) -> Self {
        Self {
            schema,
            dedupe_pool: false,
        }
    }

    /// Drop later copies of rows that repeat inside the raw candidate list.
    pub fn dedupe_pool(mut self, dedupe: bool) -> Self {
        self.dedupe_pool = dedupe;
        self
    }

    /// Categorise ages, digest every record and apply the exclusions.
    pub fn build(
        &self,
        raw_pool: &RawTable,
        always_include_raw: &RawTable,
        veto_raw: &RawTable,
        sample_size: usize,
    ) -> Result<PoolBuild> {
        let pool = self.schema.convert(raw_pool, ListKind::Candidates)?;
        let always = self.schema.convert(always_include_raw, ListKind::AlwaysInclude)?;
        let veto = self.schema.convert(veto_raw, ListKind::Veto)?;
        self.build_from_individuals(pool, always, veto, sample_size)
    }

    /// Same as [`build`](Self::build) for already converted lists.
    pub fn build_from_individuals(
        &self,
        raw_pool: Vec<Individual>,
        always_include: Vec<Individual>,
        veto: Vec<Individual>,
        sample_size: usize,
    ) -> Result<PoolBuild> {
        if sample_size == 0 {
            return Err(SortitionError::InsufficientPool(PoolShortfall::EmptySample));
        }
        if always_include.len() > sample_size {
            return Err(SortitionError::InsufficientPool(
                PoolShortfall::AlwaysIncludeExceedsSample {
                    always: always_include.len(),
                    sample_size,
                },
            ));
        }

        let mut always_digests: HashSet<RowDigest> = HashSet::with_capacity(always_include.len());
        for ind in &always_include {
            if !always_digests.insert(ind.digest()) {
                return Err(SortitionError::data_shape(
                    Stage::PoolBuild,
                    format!(
                        "always-include row {} duplicates an earlier row ({})",
                        ind.source_row(),
                        ind.digest().short()
                    ),
                ));
            }
        }
        let veto_digests: HashSet<RowDigest> = veto.iter().map(Individual::digest).collect();
        if let Some(clash) = always_include
            .iter()
            .find(|i| veto_digests.contains(&i.digest()))
        {
            return Err(SortitionError::data_shape(
                Stage::PoolBuild,
                format!(
                    "always-include row {} also appears in the veto list ({})",
                    clash.source_row(),
                    clash.digest().short()
                ),
            ));
        }

        let mut summary = PoolSummary {
            raw_candidates: raw_pool.len(),
            always_include: always_include.len(),
            veto_entries: veto.len(),
            duplicates_dropped: self.dedupe_pool,
            ..PoolSummary::default()
        };

        let mut seen: HashSet<RowDigest> = HashSet::with_capacity(raw_pool.len());
        let mut eligible = Vec::with_capacity(raw_pool.len());
        for ind in raw_pool {
            let digest = ind.digest();
            if veto_digests.contains(&digest) {
                summary.removed_by_veto += 1;
                continue;
            }
            if always_digests.contains(&digest) {
                summary.removed_as_always_include += 1;
                continue;
            }
            if !seen.insert(digest) {
                summary.duplicate_rows += 1;
                if self.dedupe_pool {
                    continue;
                }
            }
            eligible.push(ind);
        }
        summary.eligible = eligible.len();

        if summary.duplicate_rows > 0 {
            if self.dedupe_pool {
                log::warn!(
                    "dropped {} duplicate rows from the candidate list",
                    summary.duplicate_rows
                );
            } else {
                log::warn!(
                    "candidate list contains {} duplicate rows; they stay eligible",
                    summary.duplicate_rows
                );
            }
        }

        let needed = sample_size - always_include.len();
        if eligible.len() < needed {
            return Err(SortitionError::InsufficientPool(
                PoolShortfall::TooFewCandidates {
                    needed,
                    available: eligible.len(),
                },
            ));
        }

        log::info!(
            "candidate pool built: {} eligible of {} (veto removed {}, always-include removed {}), {} always included",
            summary.eligible,
            summary.raw_candidates,
            summary.removed_by_veto,
            summary.removed_as_always_include,
            summary.always_include
        );

        Ok(PoolBuild {
            pool: CandidatePool {
                individuals: eligible,
            },
            always_include,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{PopulationProfile, ProfileRow, DEFAULT_FRACTION_TOLERANCE};

    fn schema() -> RecordSchema {
        let profile = PopulationProfile::from_rows(
            vec![
                ProfileRow::new("Køn", "Mand", 0.5),
                ProfileRow::new("Køn", "Kvinde", 0.5),
            ],
            DEFAULT_FRACTION_TOLERANCE,
        )
        .unwrap();
        let headers = vec!["Id".to_string(), "Køn".to_string()];
        RecordSchema::new(&headers, &profile, &["Køn"], "Alder").unwrap()
    }

    fn table(ids: &[usize]) -> RawTable {
        RawTable::new(
            vec!["Id".into(), "Køn".into()],
            ids.iter()
                .map(|i| {
                    vec![
                        i.to_string(),
                        if i % 2 == 0 { "Mand" } else { "Kvinde" }.to_string(),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn removes_veto_and_always_include() {
        let s = schema();
        let build = CandidatePoolBuilder::new(&s)
            .build(&table(&[1, 2, 3, 4, 5, 6]), &table(&[2]), &table(&[5, 9]), 3)
            .unwrap();
        assert_eq!(build.pool.len(), 4);
        assert_eq!(build.summary.removed_by_veto, 1);
        assert_eq!(build.summary.removed_as_always_include, 1);
        assert_eq!(build.always_include.len(), 1);
        for ind in build.always_include.iter() {
            assert!(!build.pool.contains_digest(&ind.digest()));
        }
    }

    #[test]
    fn always_include_larger_than_sample_fails_first() {
        let s = schema();
        let err = CandidatePoolBuilder::new(&s)
            .build(&table(&[1]), &table(&[1, 2, 3]), &RawTable::default(), 2)
            .unwrap_err();
        assert!(matches!(
            err,
            SortitionError::InsufficientPool(PoolShortfall::AlwaysIncludeExceedsSample {
                always: 3,
                sample_size: 2
            })
        ));
    }

    #[test]
    fn too_few_candidates_fails() {
        let s = schema();
        let err = CandidatePoolBuilder::new(&s)
            .build(&table(&[1, 2, 3]), &table(&[1]), &table(&[2]), 4)
            .unwrap_err();
        assert!(matches!(
            err,
            SortitionError::InsufficientPool(PoolShortfall::TooFewCandidates {
                needed: 3,
                available: 1
            })
        ));
    }

    #[test]
    fn duplicates_are_counted_and_optionally_dropped() {
        let s = schema();
        let raw = table(&[1, 1, 2, 2, 3]);
        let kept = CandidatePoolBuilder::new(&s)
            .build(&raw, &RawTable::default(), &RawTable::default(), 2)
            .unwrap();
        assert_eq!(kept.summary.duplicate_rows, 2);
        assert_eq!(kept.pool.len(), 5);

        let dropped = CandidatePoolBuilder::new(&s)
            .dedupe_pool(true)
            .build(&raw, &RawTable::default(), &RawTable::default(), 2)
            .unwrap();
        assert_eq!(dropped.pool.len(), 3);
    }

    #[test]
    fn zero_sample_size_fails() {
        let s = schema();
        let err = CandidatePoolBuilder::new(&s)
            .build(&table(&[1, 2]), &RawTable::default(), &RawTable::default(), 0)
            .unwrap_err();
        assert_eq!(err, SortitionError::InsufficientPool(PoolShortfall::EmptySample));
        assert_eq!(err.stage(), Stage::PoolBuild);
    }

    #[test]
    fn conflicting_forced_lists_fail() {
        let s = schema();
        let err = CandidatePoolBuilder::new(&s)
            .build(&table(&[1, 2, 3]), &table(&[2]), &table(&[2]), 2)
            .unwrap_err();
        assert!(matches!(err, SortitionError::DataShape { stage: Stage::PoolBuild, .. }));
    }

    #[test]
    fn duplicate_always_include_fails() {
        let s = schema();
        let err = CandidatePoolBuilder::new(&s)
            .build(&table(&[1, 2, 3]), &table(&[2, 2]), &RawTable::default(), 3)
            .unwrap_err();
        assert!(matches!(err, SortitionError::DataShape { stage: Stage::PoolBuild, .. }));
    }
}
