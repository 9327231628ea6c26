//! Image preprocessing: normalization, deskewing and augmentation.

pub mod augment;
pub mod deskew;
pub mod normalize;

pub use augment::*;
pub use deskew::*;
pub use normalize::*;
