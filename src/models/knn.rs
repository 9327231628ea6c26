//! Brute-force k-nearest-neighbor classifier.
//!
//! Vote rules:
//! - neighbors are ordered by `(squared distance, exemplar index)`, so equal
//!   distances resolve to the exemplar seen first during fit
//! - `uniform`: one vote per neighbor
//! - `distance`: vote `1 / d`; if any chosen neighbor sits at distance 0,
//!   only the zero-distance neighbors vote, one vote each
//! - tied vote totals resolve to the smallest digit

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{Digit, Weighting};
use crate::error::AppError;
use crate::models::pca::Embedding;
use crate::models::stage::{Fit, Predict, check_lengths};

/// Unfitted kNN configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnnConfig {
    pub neighbors: usize,
    pub weighting: Weighting,
}

/// Fitted kNN: the stored exemplars and their labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Knn {
    neighbors: usize,
    weighting: Weighting,
    dim: usize,
    /// `labels.len() × dim`, row-major.
    exemplars: Vec<f64>,
    labels: Vec<Digit>,
}

impl Knn {
    pub fn exemplar_count(&self) -> usize {
        self.labels.len()
    }

    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    /// Check that the stored exemplars are usable for embeddings of length
    /// `expected_dim`.
    pub fn validate(&self, expected_dim: usize) -> Result<(), String> {
        if self.dim == 0 || self.dim != expected_dim {
            return Err(format!(
                "kNN exemplar dimension is {}, expected {expected_dim}.",
                self.dim
            ));
        }
        if self.exemplars.len() != self.labels.len() * self.dim {
            return Err(format!(
                "kNN holds {} exemplar values for {} labels of dimension {}.",
                self.exemplars.len(),
                self.labels.len(),
                self.dim
            ));
        }
        if self.neighbors == 0 || self.neighbors > self.labels.len() {
            return Err(format!(
                "kNN n_neighbors={} must be in 1..={} (stored exemplars).",
                self.neighbors,
                self.labels.len()
            ));
        }
        Ok(())
    }

    /// Classify one embedding.
    pub fn predict_one(&self, query: &[f64]) -> Digit {
        let mut dists: Vec<(f64, usize)> = self
            .exemplars
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(i, e)| (squared_distance(e, query), i))
            .collect();

        let k = self.neighbors.min(dists.len());
        let by_distance = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        if k < dists.len() {
            dists.select_nth_unstable_by(k - 1, by_distance);
            dists.truncate(k);
        }
        dists.sort_unstable_by(by_distance);

        let mut votes = [0.0f64; Digit::COUNT];
        match self.weighting {
            Weighting::Uniform => {
                for &(_, i) in &dists {
                    votes[self.labels[i].index()] += 1.0;
                }
            }
            Weighting::Distance => {
                let exact = dists.iter().any(|&(d, _)| d == 0.0);
                for &(d, i) in &dists {
                    let w = if exact {
                        if d == 0.0 { 1.0 } else { 0.0 }
                    } else {
                        1.0 / d.sqrt()
                    };
                    votes[self.labels[i].index()] += w;
                }
            }
        }

        let mut best = 0usize;
        for c in 1..Digit::COUNT {
            if votes[c] > votes[best] {
                best = c;
            }
        }
        Digit::from_index(best)
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl Fit for KnnConfig {
    type Input = Embedding;
    type Fitted = Knn;

    fn fit(&self, samples: &[Embedding], labels: &[Digit]) -> Result<Knn, AppError> {
        check_lengths(samples.len(), labels.len(), "kNN")?;
        if self.neighbors == 0 || self.neighbors > samples.len() {
            return Err(AppError::fit(format!(
                "kNN: n_neighbors={} must be in 1..={} (fitted samples).",
                self.neighbors,
                samples.len()
            )));
        }

        let dim = samples[0].len();
        if dim == 0 || samples.iter().any(|s| s.len() != dim) {
            return Err(AppError::fit("kNN: embeddings must share one non-zero dimension."));
        }

        let mut exemplars = Vec::with_capacity(samples.len() * dim);
        for s in samples {
            exemplars.extend_from_slice(s);
        }

        Ok(Knn {
            neighbors: self.neighbors,
            weighting: self.weighting,
            dim,
            exemplars,
            labels: labels.to_vec(),
        })
    }
}

impl Predict for Knn {
    type Input = Embedding;

    fn predict(&self, samples: &[Embedding]) -> Vec<Digit> {
        samples.par_iter().map(|q| self.predict_one(q)).collect()
    }
}
