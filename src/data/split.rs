//! Train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::domain::{Dataset, Digit, LabeledSample, NormalizedSample};
use crate::error::AppError;

/// Disjoint train/test subsets of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct Partition {
    pub train: Vec<LabeledSample>,
    pub test: Vec<LabeledSample>,
}

impl Partition {
    /// Split `dataset` at its split point and shuffle the training subset with
    /// a seeded RNG. The test subset keeps its original order.
    pub fn new(dataset: Dataset, seed: u64) -> Result<Self, AppError> {
        let Dataset {
            mut samples,
            split_point,
        } = dataset;

        if samples.is_empty() {
            return Err(AppError::training_data("Dataset is empty."));
        }
        if split_point == 0 || split_point >= samples.len() {
            return Err(AppError::training_data(format!(
                "Split point {split_point} leaves an empty subset ({} samples).",
                samples.len()
            )));
        }

        let test = samples.split_off(split_point);
        let mut train = samples;
        let mut rng = StdRng::seed_from_u64(seed);
        train.shuffle(&mut rng);

        Ok(Self { train, test })
    }
}

/// Split labeled samples into parallel sample/label vectors.
pub fn unzip_samples(samples: Vec<LabeledSample>) -> (Vec<NormalizedSample>, Vec<Digit>) {
    samples.into_iter().map(|s| (s.sample, s.label)).unzip()
}

/// Count of samples per digit class.
pub fn class_counts(labels: &[Digit]) -> [usize; Digit::COUNT] {
    let mut counts = [0usize; Digit::COUNT];
    for d in labels {
        counts[d.index()] += 1;
    }
    counts
}
