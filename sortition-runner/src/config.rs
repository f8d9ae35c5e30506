//! Serializable run configuration.
//!
//! A run file is TOML with three tables:
//! - `[selection]`: sample size, iteration budget, seed, threading, scored variables
//! - `[inputs]`: profile and record list paths, CSV delimiter
//! - `[output]`: artifact directory
//!
//! Every key has a default, so an empty file describes the reference run.
//! Relative paths are resolved against the directory of the run file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sortition_core::{DegeneratePolicy, DEFAULT_FRACTION_TOLERANCE};

/// Errors from reading or validating a run file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration of a selection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub selection: SelectionParams,
    pub inputs: InputPaths,
    pub output: OutputConfig,
}

/// Search and scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    /// Panel size, always-include individuals included.
    pub sample_size: usize,
    /// Number of random draws to score.
    pub iterations: usize,
    /// Master seed of the RNG hierarchy.
    pub seed: u64,
    /// 1 runs the loop on the calling thread; more uses a rayon pool.
    pub threads: usize,
    /// Variables to score, in report order.
    pub variables: Vec<String>,
    /// Profile variable whose categories are age bands.
    pub age_variable: String,
    pub degenerate_variables: DegeneratePolicy,
    pub fraction_tolerance: f64,
    /// Drop repeated rows inside the candidate list.
    pub dedupe_pool: bool,
    /// Evaluations between progress callbacks.
    pub progress_stride: usize,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            sample_size: 50,
            iterations: 5000,
            seed: 42,
            threads: 1,
            variables: ["Køn", "Etnicitet", "Uddannelse", "Alder"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            age_variable: "Alder".to_string(),
            degenerate_variables: DegeneratePolicy::Abort,
            fraction_tolerance: DEFAULT_FRACTION_TOLERANCE,
            dedupe_pool: false,
            progress_stride: 100,
        }
    }
}

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub population: PathBuf,
    pub candidates: PathBuf,
    pub always_include: Option<PathBuf>,
    pub veto: Option<PathBuf>,
    /// Single-character field delimiter shared by all input files.
    pub delimiter: char,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            population: PathBuf::from("population_fordeling.csv"),
            candidates: PathBuf::from("tilfaeldige_personer.csv"),
            always_include: None,
            veto: None,
            delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
        }
    }
}

impl SelectionConfig {
    /// Parse a run file from TOML text. Paths are left as written.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a run file, resolve its relative paths and validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Make relative input and output paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.inputs.population);
        join(&mut self.inputs.candidates);
        if let Some(p) = self.inputs.always_include.as_mut() {
            join(p);
        }
        if let Some(p) = self.inputs.veto.as_mut() {
            join(p);
        }
        join(&mut self.output.dir);
    }

    /// Check parameter ranges.
    ///
    /// Whether the sample size fits the always-include list and the pool is
    /// only known after loading and is checked by the pool builder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.selection;
        if s.sample_size == 0 {
            return Err(ConfigError::Invalid("sample_size must be positive".into()));
        }
        if s.iterations == 0 {
            return Err(ConfigError::Invalid("iterations must be positive".into()));
        }
        if s.threads == 0 {
            return Err(ConfigError::Invalid("threads must be positive".into()));
        }
        if s.progress_stride == 0 {
            return Err(ConfigError::Invalid("progress_stride must be positive".into()));
        }
        if s.variables.is_empty() {
            return Err(ConfigError::Invalid("variables must not be empty".into()));
        }
        for (i, v) in s.variables.iter().enumerate() {
            if s.variables[..i].contains(v) {
                return Err(ConfigError::Invalid(format!(
                    "variable '{v}' is listed more than once"
                )));
            }
        }
        if !(s.fraction_tolerance > 0.0 && s.fraction_tolerance < 0.5) {
            return Err(ConfigError::Invalid(format!(
                "fraction_tolerance must be in (0, 0.5), got {}",
                s.fraction_tolerance
            )));
        }
        if !self.inputs.delimiter.is_ascii() {
            return Err(ConfigError::Invalid(format!(
                "delimiter '{}' is not a single-byte character",
                self.inputs.delimiter
            )));
        }
        Ok(())
    }

    /// Delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        let mut buf = [0u8; 4];
        self.inputs.delimiter.encode_utf8(&mut buf);
        buf[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_reference_defaults() {
        let config = SelectionConfig::from_toml("").unwrap();
        assert_eq!(config, SelectionConfig::default());
        assert_eq!(config.selection.sample_size, 50);
        assert_eq!(config.selection.iterations, 5000);
        assert_eq!(
            config.selection.variables,
            vec!["Køn", "Etnicitet", "Uddannelse", "Alder"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_all_tables() {
        let toml = r#"
[selection]
sample_size = 12
iterations = 300
seed = 7
threads = 4
variables = ["Køn", "Alder"]
degenerate_variables = "skip"
dedupe_pool = true

[inputs]
population = "pop.csv"
candidates = "people.csv"
veto = "veto.csv"
delimiter = ";"

[output]
dir = "out"
"#;
        let config = SelectionConfig::from_toml(toml).unwrap();
        assert_eq!(config.selection.sample_size, 12);
        assert_eq!(config.selection.threads, 4);
        assert_eq!(config.selection.degenerate_variables, DegeneratePolicy::Skip);
        assert!(config.selection.dedupe_pool);
        assert_eq!(config.selection.age_variable, "Alder");
        assert_eq!(config.inputs.veto, Some(PathBuf::from("veto.csv")));
        assert_eq!(config.inputs.always_include, None);
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.output.dir, PathBuf::from("out"));
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = SelectionConfig::from_toml("[selection]\ndegenerate_variables = \"ignore\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let mut config = SelectionConfig::default();
        config.selection.iterations = 0;
        assert!(config.validate().is_err());

        let mut config = SelectionConfig::default();
        config.selection.variables.push("Køn".into());
        assert!(config.validate().unwrap_err().to_string().contains("Køn"));

        let mut config = SelectionConfig::default();
        config.selection.fraction_tolerance = 0.5;
        assert!(config.validate().is_err());

        let mut config = SelectionConfig::default();
        config.inputs.delimiter = 'ø';
        assert!(config.validate().is_err());
    }

    #[test]
    fn relative_paths_follow_the_run_file() {
        let mut config = SelectionConfig::default();
        config.inputs.veto = Some(PathBuf::from("lists/veto.csv"));
        config.resolve_paths(Path::new("/data/run"));
        assert_eq!(
            config.inputs.population,
            PathBuf::from("/data/run/population_fordeling.csv")
        );
        assert_eq!(config.inputs.veto, Some(PathBuf::from("/data/run/lists/veto.csv")));
        assert_eq!(config.output.dir, PathBuf::from("/data/run/results"));
    }

    #[test]
    fn toml_roundtrip() {
        let config = SelectionConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(SelectionConfig::from_toml(&text).unwrap(), config);
    }
}
