//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - image/sample types (`NormalizedSample`, `LabeledSample`, `Dataset`)
//! - hyperparameter types (`Hyperparams`, `HyperparameterGrid`, `Weighting`)
//! - run configuration (`TrainConfig`, `RecognizeConfig`)
//! - serving output (`RecognitionResult`)

pub mod types;

pub use types::*;
