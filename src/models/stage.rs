//! Capabilities shared by pipeline stages.
//!
//! Stages come in two states: an unfitted configuration implementing [`Fit`],
//! and the fitted stage it produces. Fitted stages only expose `&self`
//! methods, so their parameters cannot change between fit and predict.

use crate::domain::Digit;
use crate::error::AppError;

/// Learn stage parameters from samples (and labels, where relevant).
pub trait Fit {
    type Input;
    type Fitted;

    fn fit(&self, samples: &[Self::Input], labels: &[Digit]) -> Result<Self::Fitted, AppError>;
}

/// A fitted non-terminal stage.
pub trait Transform: Send + Sync {
    type Input;
    type Output;

    fn transform(&self, samples: &[Self::Input]) -> Vec<Self::Output>;
}

/// A fitted terminal stage (estimator).
pub trait Predict: Send + Sync {
    type Input;

    fn predict(&self, samples: &[Self::Input]) -> Vec<Digit>;
}

/// Fraction of `predicted` labels equal to `expected`.
///
/// Returns 0 for empty input.
pub fn accuracy(predicted: &[Digit], expected: &[Digit]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .zip(expected)
        .filter(|(p, e)| p == e)
        .count();
    hits as f64 / expected.len() as f64
}

pub(crate) fn check_lengths(samples: usize, labels: usize, stage: &str) -> Result<(), AppError> {
    if samples != labels {
        return Err(AppError::fit(format!(
            "{stage}: {samples} samples but {labels} labels."
        )));
    }
    if samples == 0 {
        return Err(AppError::fit(format!("{stage}: no samples to fit.")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_counts_matches() {
        let d = |v| Digit::new(v).unwrap();
        let predicted = [d(1), d(2), d(3), d(4)];
        let expected = [d(1), d(0), d(3), d(0)];
        assert!((accuracy(&predicted, &expected) - 0.5).abs() < 1e-12);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }
}
