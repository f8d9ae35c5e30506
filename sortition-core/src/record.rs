//! Typed individuals built from loosely-typed tabular rows.
//!
//! The candidate list's header fixes the canonical column order. The
//! always-include and veto lists are mapped onto it by column name, so the
//! same person produces the same digest whatever the column order of the file
//! it came from. Each scored variable is resolved once to an index into the
//! profile's category list. Scoring never touches strings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::age::AgeBandSet;
use crate::digest::RowDigest;
use crate::error::{ListKind, Result, SortitionError, Stage};
use crate::profile::PopulationProfile;

/// Header plus string cells, as read from a CSV file or built in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Convenience constructor for literals.
    pub fn from_str_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// One person, with fields in canonical column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    fields: Vec<String>,
    categories: Vec<usize>,
    digest: RowDigest,
    source_row: usize,
}

impl Individual {
    /// Field values in canonical column order. The age field holds a band label.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Profile category index of the scored variable at `slot`.
    pub fn category(&self, slot: usize) -> usize {
        self.categories[slot]
    }

    pub fn digest(&self) -> RowDigest {
        self.digest
    }

    /// Zero-based row in the list the individual was read from.
    pub fn source_row(&self) -> usize {
        self.source_row
    }
}

/// Column layout shared by all lists of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    columns: Vec<String>,
    variables: Vec<String>,
    variable_columns: Vec<usize>,
    vocabularies: Vec<Vec<String>>,
    age_column: Option<usize>,
    age_bands: Option<AgeBandSet>,
}

impl RecordSchema {
    /// Derive the schema from the candidate list header.
    ///
    /// `variables` are the scored variables. They must exist both in the
    /// profile and as columns. If the profile tracks `age_variable` and the
    /// column is present, ages are categorised into the profile's bands.
    pub fn new<S: AsRef<str>>(
        headers: &[String],
        profile: &PopulationProfile,
        variables: &[S],
        age_variable: &str,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for h in headers {
            if !seen.insert(h.as_str()) {
                return Err(SortitionError::data_shape(
                    Stage::Records,
                    format!("column '{h}' appears more than once in the candidate list"),
                ));
            }
        }
        if variables.is_empty() {
            return Err(SortitionError::data_shape(
                Stage::Records,
                "no variables selected for scoring",
            ));
        }
        profile.require_variables(variables)?;

        let mut names = Vec::with_capacity(variables.len());
        let mut variable_columns = Vec::with_capacity(variables.len());
        let mut vocabularies = Vec::with_capacity(variables.len());
        for name in variables {
            let name = name.as_ref();
            if names.iter().any(|n: &String| n == name) {
                return Err(SortitionError::data_shape(
                    Stage::Records,
                    format!("variable '{name}' is selected more than once"),
                ));
            }
            let column = headers.iter().position(|h| h == name).ok_or_else(|| {
                SortitionError::data_shape(
                    Stage::Records,
                    format!("column '{name}' is missing from the candidate list"),
                )
            })?;
            let vocabulary = profile
                .variable(name)
                .map(|v| v.labels().map(str::to_string).collect())
                .unwrap_or_default();
            names.push(name.to_string());
            variable_columns.push(column);
            vocabularies.push(vocabulary);
        }

        let age_bands = AgeBandSet::from_profile(profile, age_variable)?;
        let age_column = match age_bands {
            Some(_) => headers.iter().position(|h| h == age_variable),
            None => None,
        };

        Ok(Self {
            columns: headers.to_vec(),
            variables: names,
            variable_columns,
            vocabularies,
            age_column,
            age_bands: age_column.and(age_bands),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Scored variables; the position of a variable is its slot.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn slot_of(&self, variable: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == variable)
    }

    pub fn age_bands(&self) -> Option<&AgeBandSet> {
        self.age_bands.as_ref()
    }

    /// Convert every row of `table` into an individual.
    ///
    /// The table must carry exactly the schema's column set, in any order.
    /// A table without header and rows is treated as an empty list.
    pub fn convert(&self, table: &RawTable, list: ListKind) -> Result<Vec<Individual>> {
        if table.headers.is_empty() && table.rows.is_empty() {
            return Ok(Vec::new());
        }
        let mapping = self.column_mapping(&table.headers, list)?;

        table
            .rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                if cells.len() != table.headers.len() {
                    return Err(SortitionError::data_shape(
                        Stage::Records,
                        format!(
                            "{list} row {row} has {} cells, header has {}",
                            cells.len(),
                            table.headers.len()
                        ),
                    ));
                }
                let ordered: Vec<&str> = mapping.iter().map(|&i| cells[i].as_str()).collect();
                self.individual(&ordered, list, row)
            })
            .collect()
    }

    /// Build one individual from values in canonical column order.
    pub fn individual<S: AsRef<str>>(
        &self,
        values: &[S],
        list: ListKind,
        row: usize,
    ) -> Result<Individual> {
        if values.len() != self.columns.len() {
            return Err(SortitionError::data_shape(
                Stage::Records,
                format!(
                    "{list} row {row} has {} values, expected {}",
                    values.len(),
                    self.columns.len()
                ),
            ));
        }

        let mut fields: Vec<String> = values.iter().map(|v| v.as_ref().trim().to_string()).collect();
        if let (Some(col), Some(bands)) = (self.age_column, &self.age_bands) {
            fields[col] = bands.normalize(&fields[col], list, row)?.to_string();
        }

        let mut categories = Vec::with_capacity(self.variables.len());
        for (slot, name) in self.variables.iter().enumerate() {
            let value = &fields[self.variable_columns[slot]];
            let index = self.vocabularies[slot]
                .iter()
                .position(|label| label == value)
                .ok_or_else(|| {
                    SortitionError::data_shape(
                        Stage::Records,
                        format!(
                            "{list} row {row}: value '{value}' of variable '{name}' is not a category of the population profile"
                        ),
                    )
                })?;
            categories.push(index);
        }

        let digest = RowDigest::of_fields(&fields);
        Ok(Individual {
            fields,
            categories,
            digest,
            source_row: row,
        })
    }

    fn column_mapping(&self, headers: &[String], list: ListKind) -> Result<Vec<usize>> {
        if headers.len() != self.columns.len() {
            return Err(SortitionError::data_shape(
                Stage::Records,
                format!(
                    "{list} has {} columns, the candidate list has {} ({})",
                    headers.len(),
                    self.columns.len(),
                    self.columns.join(", ")
                ),
            ));
        }
        self.columns
            .iter()
            .map(|c| {
                headers.iter().position(|h| h == c).ok_or_else(|| {
                    SortitionError::data_shape(
                        Stage::Records,
                        format!("{list} lacks column '{c}'"),
                    )
                })
            })
            .collect()
    }
}
