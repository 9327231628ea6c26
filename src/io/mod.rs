//! Input/output helpers.
//!
//! - model artifact JSON read/write (`model_store`)
//! - cross-validation result export to CSV (`export`)

pub mod export;
pub mod model_store;

pub use export::*;
pub use model_store::*;
