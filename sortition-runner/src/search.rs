//! Sample search: the fixed-budget random-draw optimizer.
//!
//! Every iteration draws `sample_size - |always_include|` individuals without
//! replacement from the eligible pool, scores always-include ∪ drawn and keeps
//! the best. Only strict improvements replace the best, so on ties the earliest
//! iteration wins.
//!
//! Iteration `i` uses its own RNG stream derived from the master seed, so a
//! draw never depends on which thread evaluates it. With `threads > 1` the
//! scores are computed on a rayon pool, collected in iteration order and
//! reduced exactly like the sequential loop. Both modes return the same result.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sortition_core::{
    CandidatePool, DrawSeeds, Individual, PoolBuild, PoolShortfall, Scorer, SortitionError,
};

/// Errors from the search loop.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Sortition(#[from] SortitionError),

    #[error("failed to build search thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub iterations: usize,
    pub seed: u64,
    pub threads: usize,
    /// Evaluations between progress callbacks.
    pub progress_stride: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: 5000,
            seed: 42,
            threads: 1,
            progress_stride: 100,
        }
    }
}

/// Progress snapshot passed to the progress callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchProgress {
    pub evaluations: usize,
    pub total: usize,
    /// Best score among the evaluations so far.
    pub best_score: f64,
    pub elapsed_secs: f64,
}

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Always-include individuals first, then the drawn ones in draw order.
    pub best_sample: Vec<Individual>,
    pub best_score: f64,
    /// Zero-based iteration that produced the best sample.
    pub best_iteration: usize,
    pub evaluations: usize,
    /// Number of strict improvements of the best score, the first one included.
    pub improvements: usize,
    pub elapsed_secs: f64,
}

/// Running best in iteration order.
#[derive(Debug, Clone, Copy)]
struct Best {
    score: f64,
    iteration: usize,
    improvements: usize,
}

impl Best {
    fn new() -> Self {
        Self {
            score: f64::INFINITY,
            iteration: 0,
            improvements: 0,
        }
    }

    fn offer(&mut self, iteration: usize, score: f64) {
        if score < self.score {
            log::debug!(
                "iteration {iteration}: best score {:.6} -> {score:.6}",
                self.score
            );
            self.score = score;
            self.iteration = iteration;
            self.improvements += 1;
        }
    }
}

/// Shared evaluation counter and best-score watermark for progress reports.
struct Tracker<'p> {
    evaluations: AtomicUsize,
    best_bits: AtomicU64,
    total: usize,
    stride: usize,
    start: Instant,
    callback: Option<&'p (dyn Fn(&SearchProgress) + Sync)>,
}

impl<'p> Tracker<'p> {
    fn new(
        total: usize,
        stride: usize,
        callback: Option<&'p (dyn Fn(&SearchProgress) + Sync)>,
    ) -> Self {
        Self {
            evaluations: AtomicUsize::new(0),
            best_bits: AtomicU64::new(f64::INFINITY.to_bits()),
            total,
            stride: stride.max(1),
            start: Instant::now(),
            callback,
        }
    }

    /// Count one evaluation. Scores are non-negative, so their bit patterns
    /// order like the values and `fetch_min` tracks the minimum.
    fn record(&self, score: f64) {
        self.best_bits.fetch_min(score.to_bits(), Ordering::Relaxed);
        let done = self.evaluations.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(cb) = self.callback {
            if done % self.stride == 0 || done == self.total {
                cb(&SearchProgress {
                    evaluations: done,
                    total: self.total,
                    best_score: f64::from_bits(self.best_bits.load(Ordering::Relaxed)),
                    elapsed_secs: self.start.elapsed().as_secs_f64(),
                });
            }
        }
    }

    fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }
}

/// Random-draw search over a prepared pool.
#[derive(Debug, Clone)]
pub struct SampleSearch<'a> {
    pool: &'a CandidatePool,
    always_include: &'a [Individual],
    scorer: &'a Scorer,
    draw_size: usize,
    seeds: DrawSeeds,
}

impl<'a> SampleSearch<'a> {
    /// Fails with `InsufficientPool` when the lists cannot form a non-empty sample.
    pub fn new(
        pool: &'a CandidatePool,
        always_include: &'a [Individual],
        scorer: &'a Scorer,
        sample_size: usize,
        seed: u64,
    ) -> Result<Self, SortitionError> {
        if sample_size == 0 {
            return Err(SortitionError::InsufficientPool(PoolShortfall::EmptySample));
        }
        if always_include.len() > sample_size {
            return Err(SortitionError::InsufficientPool(
                PoolShortfall::AlwaysIncludeExceedsSample {
                    always: always_include.len(),
                    sample_size,
                },
            ));
        }
        let draw_size = sample_size - always_include.len();
        if pool.len() < draw_size {
            return Err(SortitionError::InsufficientPool(
                PoolShortfall::TooFewCandidates {
                    needed: draw_size,
                    available: pool.len(),
                },
            ));
        }
        Ok(Self {
            pool,
            always_include,
            scorer,
            draw_size,
            seeds: DrawSeeds::new(seed),
        })
    }

    pub fn from_build(
        build: &'a PoolBuild,
        scorer: &'a Scorer,
        sample_size: usize,
        seed: u64,
    ) -> Result<Self, SortitionError> {
        Self::new(&build.pool, &build.always_include, scorer, sample_size, seed)
    }

    /// Individuals drawn from the pool per iteration.
    pub fn draw_size(&self) -> usize {
        self.draw_size
    }

    /// Pool indices drawn at `iteration`, in draw order.
    pub fn draw(&self, iteration: usize) -> Vec<usize> {
        self.seeds
            .draw(iteration as u64, self.pool.len(), self.draw_size)
    }

    /// The candidate sample evaluated at `iteration`.
    pub fn candidate(&self, iteration: usize) -> Vec<&'a Individual> {
        let pool = self.pool;
        self.always_include
            .iter()
            .chain(self.draw(iteration).into_iter().filter_map(|i| pool.get(i)))
            .collect()
    }

    /// Score of the candidate at `iteration`.
    pub fn evaluate(&self, iteration: usize) -> f64 {
        let drawn = self.draw(iteration);
        let pool = self.pool;
        self.scorer.score(
            self.always_include
                .iter()
                .chain(drawn.iter().filter_map(|&i| pool.get(i))),
        )
    }

    /// Run the full iteration budget with the seed given at construction.
    pub fn run(
        &self,
        config: &SearchConfig,
        progress: Option<&(dyn Fn(&SearchProgress) + Sync)>,
    ) -> Result<SearchOutcome, SearchError> {
        if config.iterations == 0 {
            return Err(SortitionError::InsufficientPool(PoolShortfall::NoIterations).into());
        }

        log::info!(
            "searching {} iterations: {} always included + {} drawn from {} (seed {}, {} thread(s))",
            config.iterations,
            self.always_include.len(),
            self.draw_size,
            self.pool.len(),
            self.seeds.seed(),
            config.threads.max(1)
        );

        let tracker = Tracker::new(config.iterations, config.progress_stride, progress);
        let mut best = Best::new();

        if config.threads > 1 {
            let thread_pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build()?;
            let scores: Vec<f64> = thread_pool.install(|| {
                (0..config.iterations)
                    .into_par_iter()
                    .map(|i| {
                        let s = self.evaluate(i);
                        tracker.record(s);
                        s
                    })
                    .collect()
            });
            for (i, s) in scores.into_iter().enumerate() {
                best.offer(i, s);
            }
        } else {
            for i in 0..config.iterations {
                let s = self.evaluate(i);
                tracker.record(s);
                best.offer(i, s);
            }
        }

        let best_sample = self
            .candidate(best.iteration)
            .into_iter()
            .cloned()
            .collect();
        let outcome = SearchOutcome {
            best_sample,
            best_score: best.score,
            best_iteration: best.iteration,
            evaluations: tracker.evaluations(),
            improvements: best.improvements,
            elapsed_secs: tracker.start.elapsed().as_secs_f64(),
        };

        log::info!(
            "search finished: best score {:.6} at iteration {} ({} improvements, {:.2}s)",
            outcome.best_score,
            outcome.best_iteration,
            outcome.improvements,
            outcome.elapsed_secs
        );
        Ok(outcome)
    }
}

/// One-call search: prepare the draw and run it.
pub fn search(
    build: &PoolBuild,
    scorer: &Scorer,
    sample_size: usize,
    config: &SearchConfig,
    progress: Option<&(dyn Fn(&SearchProgress) + Sync)>,
) -> Result<SearchOutcome, SearchError> {
    SampleSearch::from_build(build, scorer, sample_size, config.seed)?.run(config, progress)
}
