//! Moment-based shear correction.
//!
//! A slanted digit has a non-zero mixed central moment `mu11`. Shearing rows
//! horizontally by `skew = mu11 / mu02` (around the canvas middle row) removes
//! that slant. The warp is inverse-mapped:
//!
//! ```text
//! dst(x, y) = src(x + skew * y - 0.5 * 28 * skew, y)
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{Digit, NormalizedSample, SIDE};
use crate::error::AppError;
use crate::math::{moments, warp_affine_inverse};
use crate::models::{Fit, Transform};

/// Below this `|mu02|` the sample is treated as already upright.
pub const MU02_EPSILON: f64 = 1e-2;

/// Deskew a single sample.
pub fn deskew(sample: &NormalizedSample) -> NormalizedSample {
    let m = moments(sample.pixels(), SIDE, SIDE);
    if m.mu02.abs() < MU02_EPSILON {
        return sample.clone();
    }

    let skew = m.mu11 / m.mu02;
    let shear = [[1.0, skew, -0.5 * SIDE as f64 * skew], [0.0, 1.0, 0.0]];
    NormalizedSample::from_canvas(warp_affine_inverse(sample.pixels(), SIDE, SIDE, &shear))
}

/// The parameterless first pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deskew;

impl Fit for Deskew {
    type Input = NormalizedSample;
    type Fitted = Deskew;

    fn fit(&self, _samples: &[NormalizedSample], _labels: &[Digit]) -> Result<Deskew, AppError> {
        Ok(Deskew)
    }
}

impl Transform for Deskew {
    type Input = NormalizedSample;
    type Output = NormalizedSample;

    fn transform(&self, samples: &[NormalizedSample]) -> Vec<NormalizedSample> {
        use rayon::prelude::*;
        samples.par_iter().map(deskew).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slanted_bar() -> NormalizedSample {
        // A bar leaning right: column shifts by one every three rows.
        NormalizedSample::from_fn(|row, col| {
            if !(4..24).contains(&row) {
                return 0;
            }
            let center = 20 - (row as i64 - 4) / 3;
            if (col as i64 - center).abs() <= 1 { 255 } else { 0 }
        })
    }

    #[test]
    fn upright_flat_sample_is_returned_unchanged() {
        let flat = NormalizedSample::from_fn(|row, col| {
            if row == 14 && (5..23).contains(&col) { 200 } else { 0 }
        });
        let once = deskew(&flat);
        let twice = deskew(&once);
        assert_eq!(once, flat);
        assert_eq!(twice, once);
    }

    #[test]
    fn deskew_is_deterministic() {
        let s = slanted_bar();
        assert_eq!(deskew(&s), deskew(&s));
    }

    #[test]
    fn deskew_reduces_slant() {
        let s = slanted_bar();
        let before = moments(s.pixels(), SIDE, SIDE);
        let after = moments(deskew(&s).pixels(), SIDE, SIDE);
        assert!(
            after.mu11.abs() < before.mu11.abs() * 0.25,
            "mu11 before={} after={}",
            before.mu11,
            after.mu11
        );
    }

    #[test]
    fn stage_transform_matches_free_function() {
        let samples = vec![slanted_bar(), NormalizedSample::blank()];
        let stage = Deskew.fit(&samples, &[]).unwrap();
        let out = stage.transform(&samples);
        assert_eq!(out[0], deskew(&samples[0]));
        assert_eq!(out[1], samples[1]);
    }
}
