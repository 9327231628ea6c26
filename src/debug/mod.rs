//! Markdown debug report of a training run.
//!
//! Captures everything needed to inspect a run after the fact: corpus sizes
//! and class balance, the full CV table (fold by fold), failures, held-out
//! results and a few misclassified test digits rendered as ASCII.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::Local;

use crate::app::pipeline::TrainingRun;
use crate::domain::Digit;
use crate::error::AppError;
use crate::plot::render_sample;
use crate::report::per_class_recall;

pub fn write_debug_report(path: &Path, run: &TrainingRun) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create debug dir '{}': {e}", parent.display())))?;
    }
    fs::write(path, render_debug_report(run))
        .map_err(|e| AppError::io(format!("Failed to write debug report '{}': {e}", path.display())))
}

/// Build the report text. Formatting into a `String` cannot fail.
pub fn render_debug_report(run: &TrainingRun) -> String {
    let mut md = String::new();
    let stats = &run.stats;

    let _ = writeln!(md, "# digits training debug report");
    let _ = writeln!(md, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(md, "- source: {}", stats.source);
    let _ = writeln!(md, "- seed: {}", stats.seed);
    let _ = writeln!(
        md,
        "- samples: train={} augmented={} test={}",
        stats.train_samples, stats.fitted_samples, stats.test_samples
    );
    let _ = writeln!(md, "- folds: {}", stats.folds);
    let _ = writeln!(
        md,
        "- grid: pca={:?} knn={:?} weights={:?}",
        run.grid.pca_components,
        run.grid.neighbors,
        run.grid.weightings.iter().map(|w| w.as_str()).collect::<Vec<_>>()
    );
    let _ = writeln!(md, "- model: {}", run.model_path.display());

    let _ = writeln!(md, "\n## Class balance (training subset)");
    let _ = writeln!(md, "| digit | count |");
    let _ = writeln!(md, "| - | - |");
    for d in Digit::all() {
        let _ = writeln!(md, "| {d} | {} |", run.train_counts[d.index()]);
    }

    let _ = writeln!(md, "\n## Cross-validation");
    let _ = writeln!(md, "| index | rank | pca | knn | weights | mean | std | folds |");
    let _ = writeln!(md, "| - | - | - | - | - | - | - | - |");
    for s in &run.outcome.scores {
        let folds: Vec<String> = s.fold_scores.iter().map(|v| format!("{v:.4}")).collect();
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {:.4} | {:.4} | {} |",
            s.index,
            s.rank,
            s.params.pca_components,
            s.params.neighbors,
            s.params.weighting.as_str(),
            s.mean,
            s.std,
            folds.join(" ")
        );
    }
    for f in &run.outcome.failed {
        let _ = writeln!(md, "- failed [{}] {}: {}", f.index, f.params, f.reason);
    }
    let _ = writeln!(
        md,
        "\nChosen: {} (cv mean {:.4})",
        run.outcome.best_score.params, run.outcome.best_score.mean
    );

    let eval = &run.evaluation;
    let _ = writeln!(md, "\n## Held-out test");
    let _ = writeln!(md, "- accuracy: {:.4} ({} samples)", eval.accuracy, eval.n);
    let _ = writeln!(md, "\n| expected | recall | most confused with |");
    let _ = writeln!(md, "| - | - | - |");
    let recall = per_class_recall(&eval.confusion);
    for d in Digit::all() {
        let row = &eval.confusion[d.index()];
        let confused = row
            .iter()
            .enumerate()
            .filter(|&(p, &n)| p != d.index() && n > 0)
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(p, n)| format!("{p} ({n})"))
            .unwrap_or_else(|| "-".to_string());
        let recall = recall[d.index()]
            .map(|r| format!("{r:.3}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(md, "| {d} | {recall} | {confused} |");
    }

    if !run.misclassified.is_empty() {
        let _ = writeln!(md, "\n## Misclassified examples");
        for (sample, predicted) in &run.misclassified {
            let _ = writeln!(md, "\nexpected {} / predicted {predicted}", sample.label);
            let _ = writeln!(md, "```\n{}```", render_sample(&sample.sample));
        }
    }

    md
}
