//! Representativeness scoring.
//!
//! For every scored variable the sample's category counts are compared with
//! the counts the population fractions predict for a sample of the same size:
//!
//! ```text
//! chi2_v  = sum over categories c with expected[c] > 0 of (observed[c] - expected[c])^2 / expected[c]
//! score   = sum over variables v of chi2_v / (scoreable_v - 1)
//! ```
//!
//! Categories with zero expected count are left out of both the statistic
//! and the degrees of freedom. Dividing by the degrees of freedom keeps
//! variables with many categories from dominating those with few. Lower is
//! better; a perfect match scores 0.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SortitionError, Stage};
use crate::profile::PopulationProfile;
use crate::record::{Individual, RecordSchema};

/// What to do with a variable that has fewer than two scoreable categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Fail with `DegenerateVariable`.
    #[default]
    Abort,
    /// Leave the variable out of the score.
    Skip,
}

/// Per-variable contribution to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableScore {
    pub variable: String,
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub normalized: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct ScoredVariable {
    name: String,
    slot: usize,
    fractions: Vec<f64>,
    degrees_of_freedom: usize,
}

/// Scorer prepared for a fixed profile, schema and variable list.
///
/// Degenerate variables are detected here, once: whether a category has a
/// non-zero expected count depends only on its population fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Scorer {
    variables: Vec<ScoredVariable>,
}

impl Scorer {
    pub fn new<S: AsRef<str>>(
        profile: &PopulationProfile,
        schema: &RecordSchema,
        variables: &[S],
        policy: DegeneratePolicy,
    ) -> Result<Self> {
        let mut scored = Vec::with_capacity(variables.len());
        for name in variables {
            let name = name.as_ref();
            let slot = schema.slot_of(name).ok_or_else(|| {
                SortitionError::data_shape(
                    Stage::Scoring,
                    format!("variable '{name}' is not part of the record schema"),
                )
            })?;
            let target = profile.variable(name).ok_or_else(|| {
                SortitionError::data_shape(
                    Stage::Scoring,
                    format!("variable '{name}' is not in the population profile"),
                )
            })?;
            let fractions: Vec<f64> = target.categories().iter().map(|c| c.fraction).collect();
            let scoreable = fractions.iter().filter(|&&p| p > 0.0).count();
            if scoreable < 2 {
                match policy {
                    DegeneratePolicy::Abort => {
                        return Err(SortitionError::DegenerateVariable {
                            variable: name.to_string(),
                            scoreable,
                        })
                    }
                    DegeneratePolicy::Skip => {
                        log::warn!(
                            "skipping variable '{name}': {scoreable} scoreable categories"
                        );
                        continue;
                    }
                }
            }
            scored.push(ScoredVariable {
                name: name.to_string(),
                slot,
                fractions,
                degrees_of_freedom: scoreable - 1,
            });
        }

        if scored.is_empty() {
            let variable = variables
                .first()
                .map(|v| v.as_ref().to_string())
                .unwrap_or_default();
            return Err(SortitionError::DegenerateVariable {
                variable,
                scoreable: 0,
            });
        }

        Ok(Self { variables: scored })
    }

    /// Names of the variables that contribute to the score.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// Score a sample.
    ///
    /// Categories with zero expected count add nothing, so an empty sample
    /// scores 0. Use [`try_score`](Self::try_score) to reject empty samples.
    pub fn score<'a, I>(&self, sample: I) -> f64
    where
        I: IntoIterator<Item = &'a Individual>,
    {
        let (n, counts) = self.count(sample);
        self.variables
            .iter()
            .zip(&counts)
            .map(|(v, observed)| chi_square(&v.fractions, observed, n) / v.degrees_of_freedom as f64)
            .sum()
    }

    /// Score a sample, failing with `DegenerateVariable` when it is empty.
    pub fn try_score(&self, sample: &[Individual]) -> Result<f64> {
        if sample.is_empty() {
            return Err(self.empty_sample_error());
        }
        Ok(self.score(sample))
    }

    fn empty_sample_error(&self) -> SortitionError {
        SortitionError::DegenerateVariable {
            variable: self
                .variables
                .first()
                .map(|v| v.name.clone())
                .unwrap_or_default(),
            scoreable: 0,
        }
    }

    /// Per-variable breakdown; the `normalized` values sum to [`score`](Self::score).
    pub fn breakdown<'a, I>(&self, sample: I) -> Vec<VariableScore>
    where
        I: IntoIterator<Item = &'a Individual>,
    {
        let (n, counts) = self.count(sample);
        self.variables
            .iter()
            .zip(&counts)
            .map(|(v, observed)| {
                let chi = chi_square(&v.fractions, observed, n);
                VariableScore {
                    variable: v.name.clone(),
                    chi_square: chi,
                    degrees_of_freedom: v.degrees_of_freedom,
                    normalized: chi / v.degrees_of_freedom as f64,
                }
            })
            .collect()
    }

    fn count<'a, I>(&self, sample: I) -> (usize, Vec<Vec<u32>>)
    where
        I: IntoIterator<Item = &'a Individual>,
    {
        let mut counts: Vec<Vec<u32>> = self
            .variables
            .iter()
            .map(|v| vec![0; v.fractions.len()])
            .collect();
        let mut n = 0usize;
        for ind in sample {
            n += 1;
            for (v, c) in self.variables.iter().zip(counts.iter_mut()) {
                c[ind.category(v.slot)] += 1;
            }
        }
        (n, counts)
    }
}

fn chi_square(fractions: &[f64], observed: &[u32], n: usize) -> f64 {
    let n = n as f64;
    fractions
        .iter()
        .zip(observed)
        .map(|(&p, &o)| (p * n, f64::from(o)))
        .filter(|&(expected, _)| expected > 0.0)
        .map(|(expected, observed)| {
            let diff = observed - expected;
            diff * diff / expected
        })
        .sum()
}

/// Score `sample` on `variables` in one call.
///
/// Fails with `DegenerateVariable` if any variable has fewer than two
/// scoreable categories, which includes every variable of an empty sample.
/// Use a [`Scorer`] when scoring many samples.
pub fn score<S: AsRef<str>>(
    profile: &PopulationProfile,
    schema: &RecordSchema,
    sample: &[Individual],
    variables: &[S],
) -> Result<f64> {
    let scorer = Scorer::new(profile, schema, variables, DegeneratePolicy::Abort)?;
    scorer.try_score(sample)
}
