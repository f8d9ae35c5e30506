//! Selection runner: wires loading, pool assembly, scoring and search.
//!
//! Entry points:
//! - `run_selection()`: loads the inputs named by the config, then runs. Used by the CLI.
//! - `run_selection_from_inputs()`: same pipeline on pre-loaded inputs, no I/O.
//! - `prepare()`: everything up to the search, used by `check`.
//! - `score_panel()`: scores an existing panel instead of searching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sortition_core::{
    CandidatePoolBuilder, Individual, ListKind, PoolBuild, PoolSummary, PopulationProfile,
    RawTable, RecordSchema, Scorer, SortitionError, VariableScore,
};

use crate::config::{ConfigError, SelectionConfig};
use crate::data_loader::{load_inputs, LoadError, LoadedInputs};
use crate::report::RepresentationReport;
use crate::search::{SampleSearch, SearchConfig, SearchError, SearchOutcome, SearchProgress};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error(transparent)]
    Selection(#[from] SortitionError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Everything needed to search, validated.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub config: SelectionConfig,
    pub profile: PopulationProfile,
    pub schema: RecordSchema,
    pub build: PoolBuild,
    pub scorer: Scorer,
}

impl PreparedRun {
    pub fn search_config(&self) -> SearchConfig {
        let s = &self.config.selection;
        SearchConfig {
            iterations: s.iterations,
            seed: s.seed,
            threads: s.threads,
            progress_stride: s.progress_stride,
        }
    }

    /// Variables that contribute to the score (degenerate ones may be skipped).
    pub fn scored_variables(&self) -> Vec<String> {
        self.scorer.variables().map(str::to_string).collect()
    }
}

/// Complete result of a selection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRun {
    pub config: SelectionConfig,
    pub columns: Vec<String>,
    pub pool: PoolSummary,
    pub scored_variables: Vec<String>,
    pub outcome: SearchOutcome,
    pub variable_scores: Vec<VariableScore>,
    pub report: RepresentationReport,
}

impl SelectionRun {
    /// Number of always-include individuals at the head of the best sample.
    pub fn always_included(&self) -> usize {
        self.pool.always_include
    }
}

/// Score of a given panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelScore {
    pub size: usize,
    pub score: f64,
    pub variable_scores: Vec<VariableScore>,
    pub report: RepresentationReport,
}

/// Load the inputs named by `config` and run the full pipeline.
pub fn run_selection(
    config: &SelectionConfig,
    progress: Option<&(dyn Fn(&SearchProgress) + Sync)>,
) -> Result<SelectionRun, RunError> {
    config.validate()?;
    let inputs = load_inputs(config)?;
    run_selection_from_inputs(config, inputs, progress)
}

/// Run the full pipeline on pre-loaded inputs.
pub fn run_selection_from_inputs(
    config: &SelectionConfig,
    inputs: LoadedInputs,
    progress: Option<&(dyn Fn(&SearchProgress) + Sync)>,
) -> Result<SelectionRun, RunError> {
    let prepared = prepare(config, inputs)?;
    let search_config = prepared.search_config();
    let search = SampleSearch::from_build(
        &prepared.build,
        &prepared.scorer,
        config.selection.sample_size,
        config.selection.seed,
    )?;
    let outcome = search.run(&search_config, progress)?;

    let variable_scores = prepared.scorer.breakdown(&outcome.best_sample);
    let report = RepresentationReport::build(
        &prepared.profile,
        &prepared.schema,
        &outcome.best_sample,
        &config.selection.variables,
    )?;

    Ok(SelectionRun {
        config: config.clone(),
        columns: prepared.schema.columns().to_vec(),
        pool: prepared.build.summary.clone(),
        scored_variables: prepared.scored_variables(),
        outcome,
        variable_scores,
        report,
    })
}

/// Validate the inputs and assemble the pool and scorer without searching.
pub fn prepare(config: &SelectionConfig, inputs: LoadedInputs) -> Result<PreparedRun, RunError> {
    config.validate()?;
    let s = &config.selection;
    let LoadedInputs {
        profile,
        candidates,
        always_include,
        veto,
    } = inputs;

    let schema = RecordSchema::new(&candidates.headers, &profile, &s.variables, &s.age_variable)?;
    let build = CandidatePoolBuilder::new(&schema)
        .dedupe_pool(s.dedupe_pool)
        .build(&candidates, &always_include, &veto, s.sample_size)?;
    let scorer = Scorer::new(&profile, &schema, &s.variables, s.degenerate_variables)?;

    Ok(PreparedRun {
        config: config.clone(),
        profile,
        schema,
        build,
        scorer,
    })
}

/// Score an existing panel against the profile.
///
/// The panel must have the candidate list's column set; it is not checked
/// against the pool. An empty panel fails with `DegenerateVariable`.
pub fn score_panel(
    config: &SelectionConfig,
    profile: &PopulationProfile,
    panel: &RawTable,
) -> Result<PanelScore, RunError> {
    let s = &config.selection;
    let schema = RecordSchema::new(&panel.headers, profile, &s.variables, &s.age_variable)?;
    let members: Vec<Individual> = schema.convert(panel, ListKind::Sample)?;
    let scorer = Scorer::new(profile, &schema, &s.variables, s.degenerate_variables)?;
    let report = RepresentationReport::build(profile, &schema, &members, &s.variables)?;

    let score = scorer.try_score(&members)?;

    Ok(PanelScore {
        size: members.len(),
        score,
        variable_scores: scorer.breakdown(&members),
        report,
    })
}
