//! Population vs. sample representation per variable and category.
//!
//! This is the data behind the comparison bar chart: one row per profile
//! category with the target fraction next to what the sample achieved.

use serde::{Deserialize, Serialize};

use sortition_core::{Individual, PopulationProfile, RecordSchema, SortitionError, Stage};

/// One category of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRepresentation {
    pub category: String,
    pub population_fraction: f64,
    pub sample_count: usize,
    pub sample_fraction: f64,
    /// `sample_fraction - population_fraction`.
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRepresentation {
    pub variable: String,
    /// Categories in profile order.
    pub categories: Vec<CategoryRepresentation>,
}

impl VariableRepresentation {
    pub fn max_abs_difference(&self) -> f64 {
        self.categories
            .iter()
            .map(|c| c.difference.abs())
            .fold(0.0, f64::max)
    }
}

/// Representation table for a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentationReport {
    pub sample_size: usize,
    pub variables: Vec<VariableRepresentation>,
}

impl RepresentationReport {
    /// Tabulate `sample` against `profile` for `variables`.
    ///
    /// Each variable must be one of the schema's scored variables.
    pub fn build<S: AsRef<str>>(
        profile: &PopulationProfile,
        schema: &RecordSchema,
        sample: &[Individual],
        variables: &[S],
    ) -> Result<Self, SortitionError> {
        let variables = variables
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let slot = schema.slot_of(name);
                let target = profile.variable(name);
                let (Some(slot), Some(target)) = (slot, target) else {
                    return Err(SortitionError::data_shape(
                        Stage::Scoring,
                        format!("variable '{name}' cannot be reported: not scored in this run"),
                    ));
                };

                let mut counts = vec![0usize; target.categories().len()];
                for ind in sample {
                    if let Some(c) = counts.get_mut(ind.category(slot)) {
                        *c += 1;
                    }
                }
                let total: usize = counts.iter().sum();

                let categories = target
                    .categories()
                    .iter()
                    .zip(counts)
                    .map(|(share, count)| {
                        let sample_fraction = if total == 0 {
                            0.0
                        } else {
                            count as f64 / total as f64
                        };
                        CategoryRepresentation {
                            category: share.label.clone(),
                            population_fraction: share.fraction,
                            sample_count: count,
                            sample_fraction,
                            difference: sample_fraction - share.fraction,
                        }
                    })
                    .collect();
                Ok(VariableRepresentation {
                    variable: name.to_string(),
                    categories,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sample_size: sample.len(),
            variables,
        })
    }

    pub fn variable(&self, name: &str) -> Option<&VariableRepresentation> {
        self.variables.iter().find(|v| v.variable == name)
    }
}
