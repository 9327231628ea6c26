//! Command-line parsing for the digit recognizer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the preprocessing/model code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{SourceKind, Weighting};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "digits", version, about = "Handwritten digit recognizer (deskew + PCA + kNN)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train a model: load a corpus, grid-search PCA/kNN settings, save the best pipeline.
    Train(TrainArgs),
    /// Recognize the digit in one or more image files (one JSON line per file).
    Recognize(RecognizeArgs),
    /// Print the normalized 28x28 grid of an image as ASCII art.
    Show(ShowArgs),
}

/// Options for training.
#[derive(Debug, Parser, Clone)]
pub struct TrainArgs {
    /// Training corpus.
    #[arg(long, value_enum, default_value_t = SourceKind::Mnist)]
    pub source: SourceKind,

    /// MNIST cache directory (default: $DIGITS_DATA_DIR or data/mnist).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Download missing MNIST files into the cache directory.
    #[arg(long)]
    pub download: bool,

    /// Base URL for MNIST downloads (default: $DIGITS_MNIST_URL or the public mirror).
    #[arg(long, value_name = "URL")]
    pub mnist_url: Option<String>,

    /// Where to write the trained model (default: $DIGITS_MODEL_PATH or model/digits.json).
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Candidate PCA component counts.
    #[arg(long, value_delimiter = ',', default_values_t = [35usize, 50])]
    pub pca: Vec<usize>,

    /// Candidate kNN neighbor counts.
    #[arg(long, value_delimiter = ',', default_values_t = [3usize, 5])]
    pub neighbors: Vec<usize>,

    /// Candidate kNN weighting schemes.
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Weighting::Uniform, Weighting::Distance])]
    pub weights: Vec<Weighting>,

    /// Number of cross-validation folds.
    #[arg(long, default_value_t = 3)]
    pub folds: usize,

    /// Seed for shuffling (and synthetic corpus generation).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Worker threads for the grid search (default: all cores).
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Skip the shifted-copy augmentation of the training subset.
    #[arg(long)]
    pub no_augment: bool,

    /// Synthetic samples per digit class (synthetic source only).
    #[arg(long, default_value_t = 200)]
    pub synthetic_per_class: usize,

    /// Fraction of each synthetic class held out for testing.
    #[arg(long, default_value_t = 0.2)]
    pub synthetic_test_fraction: f64,

    /// Export per-combination CV results to CSV.
    #[arg(long = "export-results", value_name = "CSV")]
    pub export_results: Option<PathBuf>,

    /// Write a markdown debug report of the run.
    #[arg(long = "debug-report", value_name = "MD")]
    pub debug_report: Option<PathBuf>,
}

/// Options for recognition.
#[derive(Debug, Parser, Clone)]
pub struct RecognizeArgs {
    /// Trained model (default: $DIGITS_MODEL_PATH or model/digits.json).
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Image files (PNG, JPEG, BMP, GIF).
    #[arg(required = true, value_name = "IMAGE")]
    pub images: Vec<PathBuf>,
}

/// Options for the ASCII preview.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    /// Image file to normalize.
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Also show the deskewed sample.
    #[arg(long)]
    pub deskew: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_defaults_and_lists() {
        let cli = Cli::parse_from(["digits", "train", "--pca", "10,20,30", "--weights", "distance"]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.pca, vec![10, 20, 30]);
        assert_eq!(args.neighbors, vec![3, 5]);
        assert_eq!(args.weights, vec![Weighting::Distance]);
        assert_eq!(args.folds, 3);
        assert_eq!(args.source, SourceKind::Mnist);
        assert!(args.model.is_none());
    }

    #[test]
    fn recognize_requires_images() {
        assert!(Cli::try_parse_from(["digits", "recognize"]).is_err());
        let cli = Cli::try_parse_from(["digits", "recognize", "a.png", "b.png"]).unwrap();
        let Command::Recognize(args) = cli.command else {
            panic!("expected recognize");
        };
        assert_eq!(args.images.len(), 2);
    }
}
