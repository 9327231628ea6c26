//! Terminal rendering of digit samples.

pub mod ascii;

pub use ascii::*;
