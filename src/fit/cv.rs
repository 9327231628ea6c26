//! Stratified k-fold partitioning.
//!
//! Samples are walked class by class (digit 0 first), in their original order,
//! and dealt to folds round-robin with one counter shared across classes. Each
//! class is therefore spread evenly over the folds, and every fold is
//! non-empty whenever there are at least `k` samples. No randomness: the
//! training set is already shuffled upstream.

use crate::domain::{Digit, NormalizedSample};
use crate::error::AppError;

/// Indices of one CV split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Materialized samples of one CV split, shared read-only by all search tasks.
#[derive(Debug, Clone)]
pub struct FoldData {
    pub train_x: Vec<NormalizedSample>,
    pub train_y: Vec<Digit>,
    pub val_x: Vec<NormalizedSample>,
    pub val_y: Vec<Digit>,
}

/// Build `k` stratified folds over `labels`.
pub fn stratified_folds(labels: &[Digit], k: usize) -> Result<Vec<Fold>, AppError> {
    if k < 2 {
        return Err(AppError::search_exhaustion(format!(
            "Cross-validation needs at least 2 folds (got {k})."
        )));
    }
    if labels.len() < k {
        return Err(AppError::search_exhaustion(format!(
            "Cannot split {} training samples into {k} folds.",
            labels.len()
        )));
    }

    let mut assignment = vec![0usize; labels.len()];
    let mut counter = 0usize;
    for digit in Digit::all() {
        for (i, label) in labels.iter().enumerate() {
            if *label == digit {
                assignment[i] = counter % k;
                counter += 1;
            }
        }
    }

    Ok((0..k)
        .map(|f| {
            let (validation, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&i| assignment[i] == f);
            Fold { train, validation }
        })
        .collect())
}

impl FoldData {
    pub fn gather(samples: &[NormalizedSample], labels: &[Digit], fold: &Fold) -> Self {
        let pick_x = |idx: &[usize]| idx.iter().map(|&i| samples[i].clone()).collect();
        let pick_y = |idx: &[usize]| idx.iter().map(|&i| labels[i]).collect();
        Self {
            train_x: pick_x(&fold.train),
            train_y: pick_y(&fold.train),
            val_x: pick_x(&fold.validation),
            val_y: pick_y(&fold.validation),
        }
    }
}
