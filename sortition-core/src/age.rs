//! Age categorisation against the profile's age bands.
//!
//! Band labels look like `"30-39"` or `"80+"`. Only the left boundary of each
//! label is used: bands are sorted by it, each band covers `[left, next_left)`
//! and the highest band is unbounded. Ages below the lowest boundary are out of
//! range.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ListKind, Result, SortitionError, Stage};
use crate::profile::PopulationProfile;

/// One half-open age band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBand {
    pub label: String,
    pub left: u32,
    /// `None` for the highest band.
    pub right: Option<u32>,
}

impl AgeBand {
    pub fn contains(&self, age: f64) -> bool {
        age >= f64::from(self.left) && self.right.map_or(true, |r| age < f64::from(r))
    }
}

/// Age not covered by any band.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("age {age} is not covered by any band (lowest band starts at {lowest})")]
pub struct AgeOutOfRange {
    pub age: f64,
    pub lowest: u32,
}

/// Sorted, gap-free set of age bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBandSet {
    bands: Vec<AgeBand>,
}

impl AgeBandSet {
    /// Parse band labels into a sorted band set.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        if labels.is_empty() {
            return Err(SortitionError::data_shape(
                Stage::Profile,
                "age variable has no categories",
            ));
        }

        let mut parsed: Vec<(u32, bool, String)> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref().trim();
            let (left, open) = parse_left_boundary(label)?;
            parsed.push((left, open, label.to_string()));
        }
        parsed.sort_by_key(|(left, _, _)| *left);

        for pair in parsed.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(SortitionError::data_shape(
                    Stage::Profile,
                    format!(
                        "age bands '{}' and '{}' start at the same age {}",
                        pair[0].2, pair[1].2, pair[0].0
                    ),
                ));
            }
            if pair[0].1 {
                return Err(SortitionError::data_shape(
                    Stage::Profile,
                    format!("open-ended age band '{}' is not the highest band", pair[0].2),
                ));
            }
        }

        let lefts: Vec<u32> = parsed.iter().map(|(left, _, _)| *left).collect();
        let bands = parsed
            .into_iter()
            .enumerate()
            .map(|(i, (left, _, label))| AgeBand {
                label,
                left,
                right: lefts.get(i + 1).copied(),
            })
            .collect();

        Ok(Self { bands })
    }

    /// Band set for `age_variable`, or `None` if the profile does not track it.
    pub fn from_profile(profile: &PopulationProfile, age_variable: &str) -> Result<Option<Self>> {
        match profile.variable(age_variable) {
            Some(v) => {
                let labels: Vec<&str> = v.labels().collect();
                Self::from_labels(&labels).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn bands(&self) -> &[AgeBand] {
        &self.bands
    }

    pub fn lowest(&self) -> u32 {
        self.bands.first().map_or(0, |b| b.left)
    }

    pub fn band_for(&self, age: f64) -> Option<&AgeBand> {
        if !age.is_finite() {
            return None;
        }
        let idx = self.bands.partition_point(|b| f64::from(b.left) <= age);
        if idx == 0 {
            None
        } else {
            Some(&self.bands[idx - 1])
        }
    }

    /// Label of the band containing `age`.
    pub fn categorize(&self, age: f64) -> std::result::Result<&str, AgeOutOfRange> {
        self.band_for(age)
            .map(|b| b.label.as_str())
            .ok_or(AgeOutOfRange {
                age,
                lowest: self.lowest(),
            })
    }

    pub fn is_label(&self, value: &str) -> bool {
        self.bands.iter().any(|b| b.label == value)
    }

    /// Turn a raw age cell into a band label.
    ///
    /// Values that already are band labels pass through unchanged.
    pub fn normalize(&self, raw: &str, list: ListKind, row: usize) -> Result<&str> {
        let raw = raw.trim();
        if let Some(band) = self.bands.iter().find(|b| b.label == raw) {
            return Ok(band.label.as_str());
        }
        let age: f64 = raw.parse().map_err(|_| {
            SortitionError::data_shape(
                Stage::Records,
                format!("{list} row {row}: age value '{raw}' is neither a number nor an age band"),
            )
        })?;
        self.categorize(age)
            .map_err(|e| SortitionError::OutOfRangeAge {
                list,
                row,
                age: e.age,
                lowest: e.lowest,
            })
    }
}

fn parse_left_boundary(label: &str) -> Result<(u32, bool)> {
    let bad = || {
        SortitionError::data_shape(
            Stage::Profile,
            format!("cannot read an age boundary from band label '{label}'"),
        )
    };
    if let Some(left) = label.strip_suffix('+') {
        let left = left.trim().parse::<u32>().map_err(|_| bad())?;
        return Ok((left, true));
    }
    let left = match label.split_once('-') {
        Some((left, _)) => left,
        None => label,
    };
    let left = left.trim().parse::<u32>().map_err(|_| bad())?;
    Ok((left, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands() -> AgeBandSet {
        AgeBandSet::from_labels(&["18-24", "25-34", "35-49", "50-64", "65-79", "80+"]).unwrap()
    }

    #[test]
    fn categorizes_inside_and_at_boundaries() {
        let set = bands();
        assert_eq!(set.categorize(18.0), Ok("18-24"));
        assert_eq!(set.categorize(24.9), Ok("18-24"));
        assert_eq!(set.categorize(25.0), Ok("25-34"));
        assert_eq!(set.categorize(79.0), Ok("65-79"));
        assert_eq!(set.categorize(80.0), Ok("80+"));
        assert_eq!(set.categorize(85.0), Ok("80+"));
        assert_eq!(set.categorize(120.0), Ok("80+"));
    }

    #[test]
    fn below_lowest_is_out_of_range() {
        let err = bands().categorize(17.0).unwrap_err();
        assert_eq!(err.lowest, 18);
        assert!(bands().categorize(-1.0).is_err());
        assert!(bands().categorize(f64::NAN).is_err());
    }

    #[test]
    fn labels_are_sorted_by_left_boundary() {
        let set = AgeBandSet::from_labels(&["80+", "18-39", "40-79"]).unwrap();
        let lefts: Vec<u32> = set.bands().iter().map(|b| b.left).collect();
        assert_eq!(lefts, vec![18, 40, 80]);
        assert_eq!(set.bands()[0].right, Some(40));
        assert_eq!(set.bands()[2].right, None);
    }

    #[test]
    fn printed_right_boundary_is_ignored() {
        // "18-29" says 29 but the next band starts at 35; 32 still lands in it.
        let set = AgeBandSet::from_labels(&["18-29", "35+"]).unwrap();
        assert_eq!(set.categorize(32.0), Ok("18-29"));
    }

    #[test]
    fn highest_range_label_is_unbounded() {
        let set = AgeBandSet::from_labels(&["0-49", "50-99"]).unwrap();
        assert_eq!(set.categorize(150.0), Ok("50-99"));
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!(AgeBandSet::from_labels(&["young", "80+"]).is_err());
        assert!(AgeBandSet::from_labels(&["18-24", "18-30"]).is_err());
        assert!(AgeBandSet::from_labels(&["60+", "18-59", "70+"]).is_err());
        assert!(AgeBandSet::from_labels::<&str>(&[]).is_err());
    }

    #[test]
    fn normalize_accepts_numbers_and_labels() {
        let set = bands();
        assert_eq!(set.normalize("34", ListKind::Candidates, 0).unwrap(), "25-34");
        assert_eq!(set.normalize(" 34.0 ", ListKind::Candidates, 0).unwrap(), "25-34");
        assert_eq!(set.normalize("80+", ListKind::Veto, 0).unwrap(), "80+");
    }

    #[test]
    fn normalize_errors_name_list_and_row() {
        let set = bands();
        let err = set.normalize("17", ListKind::AlwaysInclude, 4).unwrap_err();
        assert!(matches!(
            err,
            SortitionError::OutOfRangeAge {
                list: ListKind::AlwaysInclude,
                row: 4,
                lowest: 18,
                ..
            }
        ));
        let err = set.normalize("abc", ListKind::Candidates, 2).unwrap_err();
        assert!(matches!(err, SortitionError::DataShape { stage: Stage::Records, .. }));
    }
}
