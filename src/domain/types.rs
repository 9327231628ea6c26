//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during normalization, training and prediction
//! - serialized into the model artifact and CLI output
//! - constructed directly in tests

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Side length of the canonical digit canvas.
pub const SIDE: usize = 28;

/// Number of intensities in a [`NormalizedSample`] (`SIDE * SIDE`).
pub const PIXELS: usize = SIDE * SIDE;

/// A digit class label in `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

impl Digit {
    pub const COUNT: usize = 10;

    pub fn new(value: u8) -> Result<Self, AppError> {
        if value < 10 {
            Ok(Self(value))
        } else {
            Err(AppError::training_data(format!(
                "Digit label out of range: {value} (expected 0..=9)."
            )))
        }
    }

    /// Digit for a vote-table index known to be below 10.
    pub(crate) fn from_index(index: usize) -> Self {
        debug_assert!(index < Self::COUNT);
        Self(index as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// All ten digits in ascending order.
    pub fn all() -> impl Iterator<Item = Digit> {
        (0..10u8).map(Digit)
    }
}

impl TryFrom<u8> for Digit {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Digit::new(value)
    }
}

impl From<Digit> for u8 {
    fn from(value: Digit) -> Self {
        value.0
    }
}

impl std::fmt::Display for Digit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A canonical 28×28 single-channel digit image, flattened row-major.
///
/// Ink is bright (255) and background dark (0). The length is always exactly
/// [`PIXELS`]; every constructor enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedSample {
    pixels: Vec<u8>,
}

impl NormalizedSample {
    /// An all-background sample.
    pub fn blank() -> Self {
        Self {
            pixels: vec![0; PIXELS],
        }
    }

    pub fn from_vec(pixels: Vec<u8>) -> Result<Self, AppError> {
        if pixels.len() != PIXELS {
            return Err(AppError::training_data(format!(
                "Sample has {} intensities, expected {PIXELS}.",
                pixels.len()
            )));
        }
        Ok(Self { pixels })
    }

    /// Build a sample by evaluating `f(row, col)` for every canvas cell.
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut pixels = Vec::with_capacity(PIXELS);
        for row in 0..SIDE {
            for col in 0..SIDE {
                pixels.push(f(row, col));
            }
        }
        Self { pixels }
    }

    /// Wrap a canvas produced inside the crate, whose size is known to be right.
    pub(crate) fn from_canvas(pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), PIXELS);
        Self { pixels }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.pixels[row * SIDE + col]
    }
}

impl AsRef<[u8]> for NormalizedSample {
    fn as_ref(&self) -> &[u8] {
        &self.pixels
    }
}

/// A normalized sample paired with its digit label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSample {
    pub sample: NormalizedSample,
    pub label: Digit,
}

/// A labeled corpus with a fixed train/test split point.
///
/// Samples before `split_point` form the training subset, the remainder the
/// held-out test subset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub samples: Vec<LabeledSample>,
    pub split_point: usize,
}

/// How neighbors vote in the kNN classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// One vote per neighbor.
    Uniform,
    /// Votes weighted by inverse distance.
    Distance,
}

impl Weighting {
    pub const ALL: [Weighting; 2] = [Weighting::Uniform, Weighting::Distance];

    pub fn as_str(self) -> &'static str {
        match self {
            Weighting::Uniform => "uniform",
            Weighting::Distance => "distance",
        }
    }
}

/// One point of the hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hyperparams {
    /// Number of PCA components kept.
    pub pca_components: usize,
    /// Number of neighbors consulted by kNN.
    pub neighbors: usize,
    pub weighting: Weighting,
}

impl std::fmt::Display for Hyperparams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pca={} knn={} weights={}",
            self.pca_components,
            self.neighbors,
            self.weighting.as_str()
        )
    }
}

/// Candidate values per tunable knob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperparameterGrid {
    pub pca_components: Vec<usize>,
    pub neighbors: Vec<usize>,
    pub weightings: Vec<Weighting>,
}

/// Where the training corpus comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// MNIST IDX files from a local cache directory (optionally downloaded).
    Mnist,
    /// Deterministic synthetic stroke digits.
    Synthetic,
}

/// A full training run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, environment values and defaults.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub source: SourceKind,
    pub data_dir: PathBuf,
    pub download: bool,
    pub mnist_url: String,
    /// Synthetic samples generated per digit class (synthetic source only).
    pub synthetic_per_class: usize,
    /// Fraction of synthetic samples kept for the held-out test subset.
    pub synthetic_test_fraction: f64,

    pub model_path: PathBuf,
    pub grid: HyperparameterGrid,
    pub cv_folds: usize,
    pub seed: u64,
    /// Worker threads for the grid search (`None` = available parallelism).
    pub jobs: Option<usize>,
    pub augment: bool,

    pub export_results: Option<PathBuf>,
    pub debug_report: Option<PathBuf>,
}

/// Serving-side configuration.
#[derive(Debug, Clone)]
pub struct RecognizeConfig {
    pub model_path: PathBuf,
    pub images: Vec<PathBuf>,
}

/// Outcome of recognizing one raster.
///
/// Serializes as `{"status":"ok","value":7}` or `{"status":"error"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecognitionResult {
    Ok { value: u8 },
    Error,
}
