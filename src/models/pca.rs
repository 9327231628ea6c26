//! Principal component analysis stage.
//!
//! Fitting centers the data and keeps the top-`k` eigenvectors of the sample
//! covariance; transforming projects `x - mean` onto those axes (no
//! whitening). Parameters are stored as plain vectors so the fitted stage
//! serializes without any linear-algebra types.

use serde::{Deserialize, Serialize};

use crate::domain::{Digit, NormalizedSample, PIXELS};
use crate::error::AppError;
use crate::math::{column_means, covariance, principal_axes};
use crate::models::stage::{Fit, Transform, check_lengths};

/// A sample projected onto the principal axes.
pub type Embedding = Vec<f64>;

/// Unfitted PCA configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcaConfig {
    pub components: usize,
}

/// Fitted PCA projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    dim: usize,
    n_components: usize,
    mean: Vec<f64>,
    /// `n_components × dim`, row-major, one unit axis per row.
    components: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl Pca {
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Share of total variance captured by each kept axis.
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    /// Check that the stored shapes describe a usable projection of
    /// [`PIXELS`]-long samples.
    pub fn validate(&self) -> Result<(), String> {
        if self.dim != PIXELS {
            return Err(format!("PCA input dimension is {}, expected {PIXELS}.", self.dim));
        }
        if self.mean.len() != self.dim {
            return Err(format!("PCA mean has {} entries, expected {}.", self.mean.len(), self.dim));
        }
        if self.n_components == 0 || self.n_components > self.dim {
            return Err(format!(
                "PCA keeps {} components, expected 1..={}.",
                self.n_components, self.dim
            ));
        }
        if self.components.len() != self.n_components * self.dim {
            return Err(format!(
                "PCA components hold {} values, expected {}.",
                self.components.len(),
                self.n_components * self.dim
            ));
        }
        if self.explained_variance_ratio.len() != self.n_components {
            return Err(format!(
                "PCA explained variance has {} entries, expected {}.",
                self.explained_variance_ratio.len(),
                self.n_components
            ));
        }
        Ok(())
    }

    /// Project a single sample.
    pub fn project(&self, sample: &NormalizedSample) -> Embedding {
        let x = sample.pixels();
        self.components
            .chunks_exact(self.dim)
            .map(|axis| {
                axis.iter()
                    .zip(x)
                    .zip(&self.mean)
                    .map(|((a, &v), m)| a * (v as f64 - m))
                    .sum()
            })
            .collect()
    }
}

impl Fit for PcaConfig {
    type Input = NormalizedSample;
    type Fitted = Pca;

    fn fit(&self, samples: &[NormalizedSample], labels: &[Digit]) -> Result<Pca, AppError> {
        check_lengths(samples.len(), labels.len(), "PCA")?;
        let max = samples.len().min(PIXELS);
        if self.components == 0 || self.components > max {
            return Err(AppError::fit(format!(
                "PCA: n_components={} must be in 1..={max} (samples={}, features={PIXELS}).",
                self.components,
                samples.len()
            )));
        }

        let mean = column_means(samples, PIXELS);
        let cov = covariance(samples, &mean);
        let total_variance = cov.trace();
        let (axes, eigenvalues) = principal_axes(&cov, self.components);

        let explained_variance_ratio = eigenvalues
            .iter()
            .map(|v| if total_variance > 0.0 { v / total_variance } else { 0.0 })
            .collect();

        // nalgebra is column-major; copy rows out explicitly.
        let mut components = Vec::with_capacity(self.components * PIXELS);
        for r in 0..axes.nrows() {
            components.extend(axes.row(r).iter().copied());
        }

        Ok(Pca {
            dim: PIXELS,
            n_components: self.components,
            mean: mean.iter().copied().collect(),
            components,
            explained_variance_ratio,
        })
    }
}

impl Transform for Pca {
    type Input = NormalizedSample;
    type Output = Embedding;

    fn transform(&self, samples: &[NormalizedSample]) -> Vec<Embedding> {
        use rayon::prelude::*;
        samples.par_iter().map(|s| self.project(s)).collect()
    }
}
