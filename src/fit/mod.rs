//! Hyperparameter search orchestration.
//!
//! Responsibilities:
//!
//! - enumerate the hyperparameter grid in a fixed order
//! - build stratified cross-validation folds
//! - evaluate every combination (parallel) and pick the best one

pub mod cv;
pub mod grid;
pub mod search;

pub use cv::*;
pub use grid::*;
pub use search::*;
