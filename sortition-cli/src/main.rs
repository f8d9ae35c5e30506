//! Sortition CLI: select, check and score representative panels.
//!
//! Commands:
//! - `select`: run the search from a TOML run file and write artifacts
//! - `check`: load and validate the inputs, build the pool, no search
//! - `score`: score an existing panel file against the population profile

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use sortition_runner::data_loader::{load_inputs, load_profile, load_table};
use sortition_runner::export::representation_markdown;
use sortition_runner::{
    prepare, run_selection_from_inputs, save_artifacts, score_panel, RepresentationReport,
    SearchProgress, SelectionConfig, SelectionRun,
};

#[derive(Parser)]
#[command(
    name = "sortition",
    about = "Sortition CLI: pick a panel that mirrors the population"
)]
struct Cli {
    /// Log debug output, including every improvement of the best score.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the most representative panel and save the artifacts.
    Select {
        /// Path to the TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// Panel size, overriding the run file.
        #[arg(long)]
        sample_size: Option<usize>,

        /// Number of random draws, overriding the run file.
        #[arg(long)]
        iterations: Option<usize>,

        /// Master seed, overriding the run file.
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads, overriding the run file.
        #[arg(long)]
        threads: Option<usize>,

        /// Artifact directory, overriding the run file.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Hide the progress bar.
        #[arg(long, default_value_t = false)]
        no_progress: bool,
    },
    /// Validate the inputs and report pool counts without searching.
    Check {
        /// Path to the TOML run file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Score an existing panel against the population profile.
    Score {
        /// Path to the TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// Panel CSV with the candidate list's columns.
        #[arg(long)]
        sample: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Select {
            config,
            sample_size,
            iterations,
            seed,
            threads,
            output_dir,
            no_progress,
        } => {
            let mut run_config = SelectionConfig::from_file(&config)?;
            let s = &mut run_config.selection;
            if let Some(v) = sample_size {
                s.sample_size = v;
            }
            if let Some(v) = iterations {
                s.iterations = v;
            }
            if let Some(v) = seed {
                s.seed = v;
            }
            if let Some(v) = threads {
                s.threads = v;
            }
            if let Some(dir) = output_dir {
                run_config.output.dir = dir;
            }
            run_config.validate()?;
            debug!(
                "effective selection: sample size {}, {} iterations, seed {}, {} thread(s)",
                run_config.selection.sample_size,
                run_config.selection.iterations,
                run_config.selection.seed,
                run_config.selection.threads
            );
            run_select(&run_config, !no_progress)
        }
        Commands::Check { config } => run_check(&SelectionConfig::from_file(&config)?),
        Commands::Score { config, sample } => {
            run_score(&SelectionConfig::from_file(&config)?, sample)
        }
    }
}

fn run_select(config: &SelectionConfig, show_progress: bool) -> Result<()> {
    let inputs = load_inputs(config)?;

    let bar = if show_progress {
        let bar = ProgressBar::new(config.selection.iterations as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} draws ({per_sec}) {msg}")?
                .progress_chars("#>-"),
        );
        Some(bar)
    } else {
        None
    };
    let on_progress = |p: &SearchProgress| {
        if let Some(bar) = &bar {
            bar.set_position(p.evaluations as u64);
            bar.set_message(format!("best {:.4}", p.best_score));
        }
    };

    let run = run_selection_from_inputs(config, inputs, Some(&on_progress))?;
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    print_summary(&run);

    let run_dir = save_artifacts(&run, &config.output.dir)?;
    info!("artifacts saved to {}", run_dir.display());
    Ok(())
}

fn run_check(config: &SelectionConfig) -> Result<()> {
    let inputs = load_inputs(config)?;
    let prepared = prepare(config, inputs)?;
    let p = &prepared.build.summary;

    println!("Inputs OK");
    println!("  Variables:            {}", prepared.scored_variables().join(", "));
    if let Some(bands) = prepared.schema.age_bands() {
        let labels: Vec<&str> = bands.bands().iter().map(|b| b.label.as_str()).collect();
        println!("  Age bands:            {}", labels.join(", "));
    }
    println!("  Raw candidates:       {}", p.raw_candidates);
    println!("  Always include:       {}", p.always_include);
    println!("  Veto entries:         {}", p.veto_entries);
    println!("  Removed by veto:      {}", p.removed_by_veto);
    println!("  Removed (always):     {}", p.removed_as_always_include);
    if p.duplicate_rows > 0 {
        println!(
            "  Duplicate rows:       {} ({})",
            p.duplicate_rows,
            if p.duplicates_dropped { "dropped" } else { "kept" }
        );
    }
    println!("  Eligible:             {}", p.eligible);
    println!(
        "  Drawn per sample:     {}",
        prepared.build.draw_size(config.selection.sample_size)
    );
    Ok(())
}

fn run_score(config: &SelectionConfig, sample: PathBuf) -> Result<()> {
    let delimiter = config.delimiter_byte();
    let profile = load_profile(
        &config.inputs.population,
        delimiter,
        config.selection.fraction_tolerance,
    )?;
    let panel = load_table(&sample, delimiter)?;
    debug!("scoring {} panel rows from {}", panel.len(), sample.display());
    if panel.is_empty() {
        bail!("panel file {} has no rows", sample.display());
    }
    let scored = score_panel(config, &profile, &panel)
        .with_context(|| format!("failed to score {}", sample.display()))?;

    println!("Panel score: {:.6} ({} members)", scored.score, scored.size);
    for v in &scored.variable_scores {
        println!(
            "  {:<20} chi2 {:>10.4}  df {:>2}  normalized {:>10.4}",
            v.variable, v.chi_square, v.degrees_of_freedom, v.normalized
        );
    }
    println!();
    print_representation(&scored.report);
    Ok(())
}

fn print_summary(run: &SelectionRun) {
    let o = &run.outcome;
    println!("Best score:     {:.6}", o.best_score);
    println!("Best iteration: {} of {}", o.best_iteration, o.evaluations);
    println!("Improvements:   {}", o.improvements);
    println!("Elapsed:        {:.2}s", o.elapsed_secs);
    println!(
        "Pool:           {} eligible of {} ({} vetoed, {} always included)",
        run.pool.eligible, run.pool.raw_candidates, run.pool.removed_by_veto, run.pool.always_include
    );
    println!();
    print_representation(&run.report);
}

fn print_representation(report: &RepresentationReport) {
    print!("{}", representation_markdown(report));
}
