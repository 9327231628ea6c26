//! Classification pipeline stages.
//!
//! Stages are small, self-contained types implementing the capability traits
//! in [`stage`], so fitting/search code can stay generic over them.

pub mod knn;
pub mod pca;
pub mod pipeline;
pub mod stage;

pub use knn::*;
pub use pca::*;
pub use pipeline::*;
pub use stage::*;
