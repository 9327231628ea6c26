//! Labeled digit corpora.
//!
//! - `DatasetSource`: the injected "where do samples come from" seam
//! - MNIST IDX reader + downloader (`mnist`)
//! - deterministic synthetic stroke digits (`synthetic`)
//! - train/test partitioning (`split`)

pub mod mnist;
pub mod split;
pub mod synthetic;

pub use mnist::*;
pub use split::*;
pub use synthetic::*;

use crate::domain::Dataset;
use crate::error::AppError;

/// Produces a labeled corpus with a fixed train/test split point.
pub trait DatasetSource {
    /// Short human-readable name used in logs and reports.
    fn name(&self) -> &str;

    fn load_dataset(&self) -> Result<Dataset, AppError>;
}
