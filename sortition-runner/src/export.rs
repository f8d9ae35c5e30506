//! Artifact export: JSON manifest, CSV tables and a Markdown report.
//!
//! A saved run is a directory `selection_<YYYYmmdd_HHMMSS>/` holding:
//! - `manifest.json`: schema-versioned run summary
//! - `sample.csv`: the chosen panel with the candidate list's columns
//! - `representation.csv`: population vs. sample per category
//! - `report.md`: the same information as Markdown tables
//!
//! Unknown manifest schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use sortition_core::{PoolSummary, VariableScore};

use crate::config::SelectionConfig;
use crate::report::RepresentationReport;
use crate::runner::SelectionRun;

/// Current schema version for persisted manifests.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Where a panel member came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberSource {
    AlwaysInclude,
    Drawn,
}

/// One panel member in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMember {
    pub digest: String,
    pub source: MemberSource,
    /// Row in the list the member was read from.
    pub source_row: usize,
}

/// Persisted summary of a selection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub created_at: String,
    pub config: SelectionConfig,
    pub pool: PoolSummary,
    pub scored_variables: Vec<String>,
    pub best_score: f64,
    pub best_iteration: usize,
    pub evaluations: usize,
    pub improvements: usize,
    pub elapsed_secs: f64,
    pub variable_scores: Vec<VariableScore>,
    pub members: Vec<ManifestMember>,
}

impl SelectionManifest {
    pub fn from_run(run: &SelectionRun) -> Self {
        let always = run.always_included();
        let members = run
            .outcome
            .best_sample
            .iter()
            .enumerate()
            .map(|(i, ind)| ManifestMember {
                digest: ind.digest().to_hex(),
                source: if i < always {
                    MemberSource::AlwaysInclude
                } else {
                    MemberSource::Drawn
                },
                source_row: ind.source_row(),
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            created_at: chrono::Local::now().to_rfc3339(),
            config: run.config.clone(),
            pool: run.pool.clone(),
            scored_variables: run.scored_variables.clone(),
            best_score: run.outcome.best_score,
            best_iteration: run.outcome.best_iteration,
            evaluations: run.outcome.evaluations,
            improvements: run.outcome.improvements,
            elapsed_secs: run.outcome.elapsed_secs,
            variable_scores: run.variable_scores.clone(),
            members,
        }
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_manifest_json(manifest: &SelectionManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize manifest to JSON")
}

/// Deserialize a manifest, rejecting unknown schema versions.
pub fn import_manifest_json(json: &str) -> Result<SelectionManifest> {
    let manifest: SelectionManifest =
        serde_json::from_str(json).context("failed to deserialize manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// The chosen panel with the candidate list's columns; ages as band labels.
pub fn export_sample_csv(run: &SelectionRun) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&run.columns)?;
    for ind in &run.outcome.best_sample {
        wtr.write_record(ind.fields())?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: variable, category, population_fraction, sample_count,
/// sample_fraction, difference
pub fn export_representation_csv(report: &RepresentationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "variable",
        "category",
        "population_fraction",
        "sample_count",
        "sample_fraction",
        "difference",
    ])?;
    for v in &report.variables {
        for c in &v.categories {
            wtr.write_record([
                &v.variable,
                &c.category,
                &format!("{:.6}", c.population_fraction),
                &c.sample_count.to_string(),
                &format!("{:.6}", c.sample_fraction),
                &format!("{:.6}", c.difference),
            ])?;
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

/// Markdown report for a selection run.
pub fn generate_report(run: &SelectionRun) -> String {
    let mut md = String::with_capacity(2048);
    let s = &run.config.selection;
    let p = &run.pool;

    md.push_str("# Selection Report\n\n");

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Sample Size | {} |\n", s.sample_size));
    md.push_str(&format!("| Iterations | {} |\n", run.outcome.evaluations));
    md.push_str(&format!("| Seed | {} |\n", s.seed));
    md.push_str(&format!("| Variables | {} |\n", run.scored_variables.join(", ")));
    md.push_str(&format!("| Best Score | {:.6} |\n", run.outcome.best_score));
    md.push_str(&format!("| Best Iteration | {} |\n", run.outcome.best_iteration));
    md.push_str(&format!("| Improvements | {} |\n", run.outcome.improvements));
    md.push_str(&format!("| Elapsed | {:.2}s |\n", run.outcome.elapsed_secs));
    md.push('\n');

    md.push_str("## Candidate Pool\n\n");
    md.push_str("| Count | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Raw Candidates | {} |\n", p.raw_candidates));
    md.push_str(&format!("| Always Include | {} |\n", p.always_include));
    md.push_str(&format!("| Veto Entries | {} |\n", p.veto_entries));
    md.push_str(&format!("| Removed by Veto | {} |\n", p.removed_by_veto));
    md.push_str(&format!(
        "| Removed as Always Include | {} |\n",
        p.removed_as_always_include
    ));
    if p.duplicate_rows > 0 {
        md.push_str(&format!(
            "| Duplicate Rows | {} ({}) |\n",
            p.duplicate_rows,
            if p.duplicates_dropped { "dropped" } else { "kept" }
        ));
    }
    md.push_str(&format!("| Eligible | {} |\n", p.eligible));
    md.push('\n');

    md.push_str("## Score Breakdown\n\n");
    md.push_str("| Variable | Chi-square | df | Normalized |\n");
    md.push_str("| --- | ---: | ---: | ---: |\n");
    for v in &run.variable_scores {
        md.push_str(&format!(
            "| {} | {:.4} | {} | {:.4} |\n",
            v.variable, v.chi_square, v.degrees_of_freedom, v.normalized
        ));
    }
    md.push('\n');

    md.push_str(&representation_markdown(&run.report));
    md
}

/// One table per variable: population vs. sample fraction per category.
pub fn representation_markdown(report: &RepresentationReport) -> String {
    let mut md = String::new();
    md.push_str("## Representation\n\n");
    for v in &report.variables {
        md.push_str(&format!("### {}\n\n", v.variable));
        md.push_str("| Category | Population | Sample | Count | Difference |\n");
        md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
        for c in &v.categories {
            md.push_str(&format!(
                "| {} | {:.1}% | {:.1}% | {} | {:+.1} pp |\n",
                c.category,
                c.population_fraction * 100.0,
                c.sample_fraction * 100.0,
                c.sample_count,
                c.difference * 100.0
            ));
        }
        md.push('\n');
    }
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set under `output_dir`; returns the run directory.
pub fn save_artifacts(run: &SelectionRun, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("selection_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let manifest = SelectionManifest::from_run(run);
    std::fs::write(run_dir.join("manifest.json"), export_manifest_json(&manifest)?)?;
    std::fs::write(run_dir.join("sample.csv"), export_sample_csv(run)?)?;
    std::fs::write(
        run_dir.join("representation.csv"),
        export_representation_csv(&run.report)?,
    )?;
    std::fs::write(run_dir.join("report.md"), generate_report(run))?;

    log::info!("artifacts written to {}", run_dir.display());
    Ok(run_dir)
}

/// Load the manifest of an artifact directory.
pub fn load_manifest(dir: &Path) -> Result<SelectionManifest> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest_json(&json)
}
