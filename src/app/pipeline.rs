//! Shared "training run" logic used by the CLI and the integration tests.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! source -> partition/shuffle -> augment -> grid search -> save -> evaluate

use std::path::PathBuf;

use tracing::info;

use crate::data::{DatasetSource, MnistSource, Partition, SyntheticSource, class_counts, unzip_samples};
use crate::domain::{Digit, HyperparameterGrid, LabeledSample, SourceKind, TrainConfig};
use crate::error::AppError;
use crate::fit::{SearchOptions, SearchOutcome, grid_search};
use crate::io::{ModelArtifact, save_model};
use crate::models::Predict;
use crate::preprocess::augment;
use crate::report::{Evaluation, TrainingStats, evaluate_predictions};

/// Misclassified test digits kept for the debug report.
const MAX_MISCLASSIFIED: usize = 10;

/// All computed outputs of a single `digits train` run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub stats: TrainingStats,
    pub grid: HyperparameterGrid,
    pub train_counts: [usize; Digit::COUNT],
    pub outcome: SearchOutcome,
    pub evaluation: Evaluation,
    pub misclassified: Vec<(LabeledSample, Digit)>,
    pub model_path: PathBuf,
}

/// Build the configured dataset source.
pub fn source_from_config(config: &TrainConfig) -> Box<dyn DatasetSource> {
    match config.source {
        SourceKind::Mnist => Box::new(MnistSource {
            data_dir: config.data_dir.clone(),
            download: config.download,
            base_url: config.mnist_url.clone(),
        }),
        SourceKind::Synthetic => Box::new(SyntheticSource {
            per_class: config.synthetic_per_class,
            test_fraction: config.synthetic_test_fraction,
            seed: config.seed,
        }),
    }
}

/// Execute the full training workflow with the configured source.
pub fn run_training(config: &TrainConfig) -> Result<TrainingRun, AppError> {
    let source = source_from_config(config);
    run_training_with_source(config, source.as_ref())
}

/// Execute the training workflow with an injected source.
pub fn run_training_with_source(
    config: &TrainConfig,
    source: &dyn DatasetSource,
) -> Result<TrainingRun, AppError> {
    // 1) Load and partition the corpus.
    let dataset = source.load_dataset()?;
    let partition = Partition::new(dataset, config.seed)?;
    let train_samples = partition.train.len();
    info!(
        source = source.name(),
        train = train_samples,
        test = partition.test.len(),
        "dataset ready"
    );

    // 2) Augment the training subset only.
    let train = if config.augment {
        augment(&partition.train)
    } else {
        partition.train
    };
    let (train_x, train_y) = unzip_samples(train);
    let train_counts = class_counts(&train_y);

    // 3) Cross-validated grid search; the winner comes back refit on all of train.
    let opts = SearchOptions {
        folds: config.cv_folds,
        jobs: config.jobs,
    };
    let outcome = grid_search(&train_x, &train_y, &config.grid, &opts)?;
    let fitted_samples = train_x.len();
    drop(train_x);

    // 4) Persist.
    let artifact = ModelArtifact::new(outcome.best.clone(), outcome.best_score.mean);
    save_model(&artifact, &config.model_path)?;

    // 5) Held-out evaluation.
    let test = partition.test;
    let (test_x, test_y): (Vec<_>, Vec<_>) = test.iter().map(|s| (s.sample.clone(), s.label)).unzip();
    let predicted = outcome.best.predict(&test_x);
    let evaluation = evaluate_predictions(&predicted, &test_y);
    let misclassified = test
        .into_iter()
        .zip(predicted)
        .filter(|(s, p)| s.label != *p)
        .take(MAX_MISCLASSIFIED)
        .collect();
    info!(accuracy = evaluation.accuracy, n = evaluation.n, "held-out evaluation");

    Ok(TrainingRun {
        stats: TrainingStats {
            source: source.name().to_string(),
            train_samples,
            fitted_samples,
            test_samples: test_y.len(),
            folds: config.cv_folds,
            seed: config.seed,
        },
        grid: config.grid.clone(),
        train_counts,
        outcome,
        evaluation,
        misclassified,
        model_path: config.model_path.clone(),
    })
}
