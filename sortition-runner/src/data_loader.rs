//! CSV loading of the population profile and the record lists.
//!
//! The profile file has one row per (variable, category) with a fraction.
//! Header names are accepted in English (`Variable`, `Category`, `Fraction`)
//! or Danish (`Variabel`, `Kategori`, `Brøkdel`). With `;` as delimiter the
//! fractions may use a decimal comma.
//!
//! Record lists are read as plain string tables; interpreting them is the
//! job of `RecordSchema` in the core crate.

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use sortition_core::{PopulationProfile, ProfileRow, RawTable, SortitionError};

use crate::config::SelectionConfig;

/// Errors from the loading layer. Every variant names the file involved.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {detail}")]
    Format { path: PathBuf, detail: String },

    #[error("{path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: SortitionError,
    },
}

const VARIABLE_HEADERS: [&str; 2] = ["Variable", "Variabel"];
const CATEGORY_HEADERS: [&str; 2] = ["Category", "Kategori"];
const FRACTION_HEADERS: [&str; 2] = ["Fraction", "Brøkdel"];

/// Everything a run reads from disk.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub profile: PopulationProfile,
    pub candidates: RawTable,
    pub always_include: RawTable,
    pub veto: RawTable,
}

/// Load the profile and all record lists named by `config`.
pub fn load_inputs(config: &SelectionConfig) -> Result<LoadedInputs, LoadError> {
    let delimiter = config.delimiter_byte();
    let profile = load_profile(
        &config.inputs.population,
        delimiter,
        config.selection.fraction_tolerance,
    )?;
    let candidates = load_table(&config.inputs.candidates, delimiter)?;
    let always_include = load_optional_table(config.inputs.always_include.as_deref(), delimiter)?;
    let veto = load_optional_table(config.inputs.veto.as_deref(), delimiter)?;

    log::info!(
        "loaded {} candidates, {} always-include and {} veto rows",
        candidates.len(),
        always_include.len(),
        veto.len()
    );

    Ok(LoadedInputs {
        profile,
        candidates,
        always_include,
        veto,
    })
}

/// Read and validate a population profile file.
pub fn load_profile(
    path: &Path,
    delimiter: u8,
    tolerance: f64,
) -> Result<PopulationProfile, LoadError> {
    let file = open(path)?;
    let rows = read_profile_rows(file, delimiter, path)?;
    PopulationProfile::from_rows(rows, tolerance).map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse profile rows from any reader. `source` is only used in errors.
pub fn read_profile_rows<R: Read>(
    reader: R,
    delimiter: u8,
    source: &Path,
) -> Result<Vec<ProfileRow>, LoadError> {
    let table = read_table(reader, delimiter, source)?;
    let find = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| table.column_index(n))
            .ok_or_else(|| LoadError::Format {
                path: source.to_path_buf(),
                detail: format!(
                    "profile header lacks a '{}' column (found: {})",
                    names.join("' or '"),
                    table.headers.join(", ")
                ),
            })
    };
    let variable = find(&VARIABLE_HEADERS)?;
    let category = find(&CATEGORY_HEADERS)?;
    let fraction = find(&FRACTION_HEADERS)?;

    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");
            let raw = cell(fraction);
            let value = parse_fraction(raw, delimiter).ok_or_else(|| LoadError::Format {
                path: source.to_path_buf(),
                detail: format!("row {i}: fraction '{raw}' is not a number"),
            })?;
            Ok(ProfileRow::new(cell(variable), cell(category), value))
        })
        .collect()
}

fn parse_fraction(raw: &str, delimiter: u8) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<f64>() {
        return Some(v);
    }
    if delimiter == b';' {
        return raw.replace(',', ".").parse::<f64>().ok();
    }
    None
}

/// Read a record list.
pub fn load_table(path: &Path, delimiter: u8) -> Result<RawTable, LoadError> {
    let file = open(path)?;
    read_table(file, delimiter, path)
}

/// Read an optional record list; `None` is an empty list.
pub fn load_optional_table(path: Option<&Path>, delimiter: u8) -> Result<RawTable, LoadError> {
    match path {
        Some(p) => load_table(p, delimiter),
        None => Ok(RawTable::default()),
    }
}

/// Read a header plus string rows from any reader. Cells are trimmed.
pub fn read_table<R: Read>(reader: R, delimiter: u8, source: &Path) -> Result<RawTable, LoadError> {
    let csv_err = |e: csv::Error| LoadError::Csv {
        path: source.to_path_buf(),
        source: e,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers().map_err(csv_err)?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable::new(headers, rows))
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
