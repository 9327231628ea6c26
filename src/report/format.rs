//! Formatted terminal output for training runs.
//!
//! We keep formatting code in one place so:
//! - the search/model code stays clean and testable
//! - output changes are localized

use crate::domain::Digit;
use crate::fit::{CombinationScore, SearchOutcome};
use crate::report::{Evaluation, per_class_recall};

/// Corpus sizes of one training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingStats {
    pub source: String,
    pub train_samples: usize,
    /// Training samples after augmentation (equal to `train_samples` when off).
    pub fitted_samples: usize,
    pub test_samples: usize,
    pub folds: usize,
    pub seed: u64,
}

/// Format the run header plus the ranked search results.
pub fn format_run_summary(stats: &TrainingStats, outcome: &SearchOutcome, top_n: usize) -> String {
    let mut out = String::new();

    out.push_str("=== digits - PCA/kNN digit recognizer ===\n");
    out.push_str(&format!("Source: {} (seed={})\n", stats.source, stats.seed));
    out.push_str(&format!(
        "Samples: train={} | augmented={} | test={}\n",
        stats.train_samples, stats.fitted_samples, stats.test_samples
    ));
    out.push_str(&format!(
        "Search: {} combinations x {} folds ({} failed)\n",
        outcome.scores.len() + outcome.failed.len(),
        stats.folds,
        outcome.failed.len()
    ));

    out.push_str("\nCross-validation (best first):\n");
    out.push_str(&format_score_table(&ranked(&outcome.scores, top_n), outcome.best_score.index));
    for f in &outcome.failed {
        out.push_str(&format!("  (failed [{}] {}) {}\n", f.index, f.params, f.reason));
    }

    out.push_str("\nChosen hyperparameters:\n");
    out.push_str(&format!("- {}\n", outcome.best_score.params));
    out.push_str(&format!(
        "- cv accuracy: {:.4} (+/- {:.4})\n",
        outcome.best_score.mean, outcome.best_score.std
    ));
    let evr: f64 = outcome.best.pca().explained_variance_ratio().iter().sum();
    out.push_str(&format!("- explained variance: {:.2}%\n", evr * 100.0));
    out.push('\n');

    out
}

fn ranked(scores: &[CombinationScore], top_n: usize) -> Vec<&CombinationScore> {
    let mut rows: Vec<&CombinationScore> = scores.iter().collect();
    rows.sort_by_key(|s| s.rank);
    rows.truncate(top_n);
    rows
}

fn format_score_table(rows: &[&CombinationScore], best_index: usize) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "  {:>4} {:>5} {:>5} {:<9} {:>8} {:>8}\n",
            "rank", "pca", "knn", "weights", "mean", "std"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("  {:-<4} {:-<5} {:-<5} {:-<9} {:-<8} {:-<8}\n", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for s in rows {
        let chosen = if s.index == best_index { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:>4} {:>5} {:>5} {:<9} {:>8.4} {:>8.4}\n",
            s.rank,
            s.params.pca_components,
            s.params.neighbors,
            s.params.weighting.as_str(),
            s.mean,
            s.std
        ));
    }
    out
}

/// Format held-out accuracy, per-class recall and the confusion matrix.
pub fn format_evaluation(eval: &Evaluation) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Test accuracy: {:.4} ({} samples)\n\n",
        eval.accuracy, eval.n
    ));

    out.push_str("Confusion matrix (rows = expected, cols = predicted):\n");
    out.push_str("     ");
    for d in Digit::all() {
        out.push_str(&format!("{d:>6}"));
    }
    out.push_str("  recall\n");

    let recall = per_class_recall(&eval.confusion);
    for d in Digit::all() {
        out.push_str(&format!("  {d:>2} "));
        for count in &eval.confusion[d.index()] {
            out.push_str(&format!("{count:>6}"));
        }
        match recall[d.index()] {
            Some(r) => out.push_str(&format!("  {r:.3}\n")),
            None => out.push_str("  -\n"),
        }
    }
    out
}
