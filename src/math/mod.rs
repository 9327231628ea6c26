//! Mathematical utilities: image moments, affine warps and PCA linear algebra.

pub mod linalg;
pub mod moments;
pub mod warp;

pub use linalg::*;
pub use moments::*;
pub use warp::*;
