//! Training-set augmentation by one-pixel translations.

use tracing::{debug, info};

use crate::domain::{LabeledSample, NormalizedSample, SIDE};

/// `(dx, dy)` offsets applied to every sample, in output order.
pub const SHIFTS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Translate a sample by `(dx, dy)` pixels, zero-filling the vacated edge.
pub fn shift(sample: &NormalizedSample, dx: i64, dy: i64) -> NormalizedSample {
    let side = SIDE as i64;
    NormalizedSample::from_fn(|row, col| {
        let sr = row as i64 - dy;
        let sc = col as i64 - dx;
        if (0..side).contains(&sr) && (0..side).contains(&sc) {
            sample.get(sr as usize, sc as usize)
        } else {
            0
        }
    })
}

/// Originals followed by four shifted copies of each sample (5× the input).
///
/// Copies keep their source's label and appear in sample order, shifts in
/// [`SHIFTS`] order.
pub fn augment(samples: &[LabeledSample]) -> Vec<LabeledSample> {
    let mut out = Vec::with_capacity(samples.len() * (SHIFTS.len() + 1));
    out.extend_from_slice(samples);

    for (i, s) in samples.iter().enumerate() {
        for (dx, dy) in SHIFTS {
            out.push(LabeledSample {
                sample: shift(&s.sample, dx, dy),
                label: s.label,
            });
        }
        if (i + 1) % 10_000 == 0 {
            debug!(done = i + 1, total = samples.len(), "augmenting");
        }
    }

    info!(
        original = samples.len(),
        augmented = out.len(),
        "training set augmented"
    );
    out
}
