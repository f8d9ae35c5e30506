//! Population profile: target category fractions per tracked variable.
//!
//! The profile is the ground truth a sample has to approximate. It is built
//! once from `(variable, category, fraction)` rows and never mutated. Row order
//! is preserved: the first appearance of a variable fixes its position, and the
//! order of its rows fixes the category ordering used by scoring and reports.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SortitionError, Stage};

/// Default allowed deviation of a variable's fraction sum from 1.0.
pub const DEFAULT_FRACTION_TOLERANCE: f64 = 1e-3;

/// One input row of a population profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub variable: String,
    pub category: String,
    pub fraction: f64,
}

impl ProfileRow {
    pub fn new(variable: impl Into<String>, category: impl Into<String>, fraction: f64) -> Self {
        Self {
            variable: variable.into(),
            category: category.into(),
            fraction,
        }
    }
}

/// Target share of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub label: String,
    pub fraction: f64,
}

/// All categories of one variable, in profile order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableProfile {
    name: String,
    categories: Vec<CategoryShare>,
}

impl VariableProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn categories(&self) -> &[CategoryShare] {
        &self.categories
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.label.as_str())
    }

    pub fn category_index(&self, label: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.label == label)
    }

    pub fn fraction_sum(&self) -> f64 {
        self.categories.iter().map(|c| c.fraction).sum()
    }
}

/// Immutable collection of per-variable category fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationProfile {
    variables: Vec<VariableProfile>,
}

impl PopulationProfile {
    /// Build and validate a profile.
    ///
    /// Fails with `DataShape` when the input is empty, a fraction is outside
    /// `[0, 1]`, a category label repeats within a variable, or a variable's
    /// fractions do not sum to 1 within `tolerance`.
    pub fn from_rows<I>(rows: I, tolerance: f64) -> Result<Self>
    where
        I: IntoIterator<Item = ProfileRow>,
    {
        let mut variables: Vec<VariableProfile> = Vec::new();

        for (row_index, row) in rows.into_iter().enumerate() {
            let variable = row.variable.trim();
            let label = row.category.trim();
            if variable.is_empty() || label.is_empty() {
                return Err(SortitionError::data_shape(
                    Stage::Profile,
                    format!("row {row_index} has an empty variable or category"),
                ));
            }
            if !row.fraction.is_finite() || !(0.0..=1.0).contains(&row.fraction) {
                return Err(SortitionError::data_shape(
                    Stage::Profile,
                    format!(
                        "row {row_index}: fraction {} for {variable}/{label} is outside [0, 1]",
                        row.fraction
                    ),
                ));
            }

            let slot = match variables.iter().position(|v| v.name == variable) {
                Some(i) => i,
                None => {
                    variables.push(VariableProfile {
                        name: variable.to_string(),
                        categories: Vec::new(),
                    });
                    variables.len() - 1
                }
            };
            let target = &mut variables[slot];
            if target.category_index(label).is_some() {
                return Err(SortitionError::data_shape(
                    Stage::Profile,
                    format!("category '{label}' appears more than once for variable '{variable}'"),
                ));
            }
            target.categories.push(CategoryShare {
                label: label.to_string(),
                fraction: row.fraction,
            });
        }

        if variables.is_empty() {
            return Err(SortitionError::data_shape(
                Stage::Profile,
                "population profile has no rows",
            ));
        }

        for v in &variables {
            let sum = v.fraction_sum();
            if (sum - 1.0).abs() > tolerance {
                return Err(SortitionError::data_shape(
                    Stage::Profile,
                    format!(
                        "fractions of variable '{}' sum to {sum:.6}, expected 1 (tolerance {tolerance})",
                        v.name
                    ),
                ));
            }
        }

        log::info!(
            "population profile loaded: {} variables, {} categories",
            variables.len(),
            variables.iter().map(|v| v.categories.len()).sum::<usize>()
        );

        Ok(Self { variables })
    }

    pub fn variables(&self) -> &[VariableProfile] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableProfile> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    /// Check that every requested variable exists in the profile.
    pub fn require_variables<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            if self.variable(name).is_none() {
                let known: Vec<&str> = self.variables.iter().map(|v| v.name()).collect();
                return Err(SortitionError::data_shape(
                    Stage::Profile,
                    format!(
                        "variable '{name}' is not in the population profile (known: {})",
                        known.join(", ")
                    ),
                ));
            }
        }
        Ok(())
    }
}
