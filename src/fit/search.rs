//! Cross-validated grid search over pipeline hyperparameters.
//!
//! Shape of a search:
//!
//! 1. enumerate the grid (fixed order, see [`enumerate_grid`])
//! 2. build the stratified folds once; fold samples are shared read-only
//! 3. fan out one task per combination on a bounded rayon pool; each task fits
//!    its own pipeline per fold and reports per-fold accuracy
//! 4. after every task finished, reduce: highest mean accuracy wins, ties go
//!    to the lowest enumeration index
//! 5. refit the winner on the full training set

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{Digit, HyperparameterGrid, Hyperparams, NormalizedSample};
use crate::error::AppError;
use crate::fit::cv::{FoldData, stratified_folds};
use crate::fit::grid::enumerate_grid;
use crate::models::{ClassificationPipeline, Fit, FittedPipeline};

/// Search execution knobs.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub folds: usize,
    /// Worker threads (`None` = rayon default, one per core).
    pub jobs: Option<usize>,
}

/// Cross-validation result of one grid combination.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationScore {
    /// Enumeration index within the grid.
    pub index: usize,
    pub params: Hyperparams,
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
    /// 1-based rank by mean accuracy (ties ordered by index).
    pub rank: usize,
}

/// A combination that could not complete cross-validation.
#[derive(Debug, Clone)]
pub struct FailedCombination {
    pub index: usize,
    pub params: Hyperparams,
    pub reason: String,
}

/// Output of a full search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Winner refit on the whole training set.
    pub best: FittedPipeline,
    pub best_score: CombinationScore,
    /// Scores of all successful combinations, in enumeration order.
    pub scores: Vec<CombinationScore>,
    pub failed: Vec<FailedCombination>,
}

/// Run the grid search and return the refit winner.
pub fn grid_search(
    samples: &[NormalizedSample],
    labels: &[Digit],
    grid: &HyperparameterGrid,
    opts: &SearchOptions,
) -> Result<SearchOutcome, AppError> {
    if samples.len() != labels.len() {
        return Err(AppError::training_data(format!(
            "{} samples but {} labels.",
            samples.len(),
            labels.len()
        )));
    }
    if samples.is_empty() {
        return Err(AppError::training_data("No training samples to search over."));
    }

    let combos = enumerate_grid(grid)?;
    let folds = stratified_folds(labels, opts.folds)?;
    let fold_data: Vec<FoldData> = folds
        .iter()
        .map(|f| FoldData::gather(samples, labels, f))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.unwrap_or(0))
        .build()
        .map_err(|e| AppError::config(format!("Failed to start worker pool: {e}")))?;

    info!(
        combinations = combos.len(),
        folds = folds.len(),
        workers = pool.current_num_threads(),
        "starting grid search"
    );

    let total = combos.len();
    let outcomes: Vec<Result<CombinationScore, FailedCombination>> = pool.install(|| {
        combos
            .par_iter()
            .enumerate()
            .map(|(index, &params)| evaluate_combination(index, total, params, &fold_data))
            .collect()
    });
    drop(fold_data);

    let mut scores = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(score) => scores.push(score),
            Err(fail) => failed.push(fail),
        }
    }

    let Some(best_idx) = select_best(&scores) else {
        let reasons: Vec<String> = failed
            .iter()
            .map(|f| format!("[{}] {}: {}", f.index, f.params, f.reason))
            .collect();
        return Err(AppError::search_exhaustion(format!(
            "No hyperparameter combination completed cross-validation.\n{}",
            reasons.join("\n")
        )));
    };
    assign_ranks(&mut scores);
    let best_score = scores[best_idx].clone();

    info!(params = %best_score.params, mean = best_score.mean, "refitting best combination");
    let best = pool.install(|| ClassificationPipeline::new(best_score.params).fit(samples, labels))?;

    Ok(SearchOutcome {
        best,
        best_score,
        scores,
        failed,
    })
}

fn evaluate_combination(
    index: usize,
    total: usize,
    params: Hyperparams,
    folds: &[FoldData],
) -> Result<CombinationScore, FailedCombination> {
    let mut fold_scores = Vec::with_capacity(folds.len());
    for (f, data) in folds.iter().enumerate() {
        let fitted = ClassificationPipeline::new(params)
            .fit(&data.train_x, &data.train_y)
            .map_err(|e| {
                warn!(%params, fold = f, error = %e, "combination failed");
                FailedCombination {
                    index,
                    params,
                    reason: format!("fold {f}: {e}"),
                }
            })?;
        fold_scores.push(fitted.score(&data.val_x, &data.val_y));
    }

    let (mean, std) = mean_std(&fold_scores);
    info!(
        "[{}/{}] {} -> mean accuracy {:.4} (+/- {:.4})",
        index + 1,
        total,
        params,
        mean,
        std
    );
    Ok(CombinationScore {
        index,
        params,
        fold_scores,
        mean,
        std,
        rank: 0,
    })
}

/// Position (in `scores`) of the best mean accuracy; ties go to the lowest
/// enumeration index.
pub fn select_best(scores: &[CombinationScore]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, s) in scores.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(b) => {
                let cur = &scores[b];
                if s.mean > cur.mean || (s.mean == cur.mean && s.index < cur.index) {
                    best = Some(i);
                }
            }
        }
    }
    best
}

fn assign_ranks(scores: &mut [CombinationScore]) {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .mean
            .total_cmp(&scores[a].mean)
            .then(scores[a].index.cmp(&scores[b].index))
    });
    for (rank, i) in order.into_iter().enumerate() {
        scores[i].rank = rank + 1;
    }
}

/// Mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
