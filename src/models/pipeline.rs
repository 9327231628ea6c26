//! The fixed Deskew → PCA → kNN classification pipeline.
//!
//! [`ClassificationPipeline`] is the unfitted configuration; fitting it yields
//! a [`FittedPipeline`], which only offers read-only prediction. Stage order is
//! fixed by the struct layout, not assembled at runtime.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Digit, Hyperparams, NormalizedSample};
use crate::error::AppError;
use crate::models::knn::{Knn, KnnConfig};
use crate::models::pca::{Pca, PcaConfig};
use crate::models::stage::{Fit, Predict, Transform, accuracy, check_lengths};
use crate::preprocess::Deskew;

/// An unfitted pipeline for one hyperparameter combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationPipeline {
    pub params: Hyperparams,
}

impl ClassificationPipeline {
    pub fn new(params: Hyperparams) -> Self {
        Self { params }
    }
}

impl Fit for ClassificationPipeline {
    type Input = NormalizedSample;
    type Fitted = FittedPipeline;

    fn fit(&self, samples: &[NormalizedSample], labels: &[Digit]) -> Result<FittedPipeline, AppError> {
        check_lengths(samples.len(), labels.len(), "pipeline")?;

        let deskew = Deskew.fit(samples, labels)?;
        let upright = deskew.transform(samples);

        let pca = PcaConfig {
            components: self.params.pca_components,
        }
        .fit(&upright, labels)?;
        let embedded = pca.transform(&upright);
        drop(upright);

        let knn = KnnConfig {
            neighbors: self.params.neighbors,
            weighting: self.params.weighting,
        }
        .fit(&embedded, labels)?;

        debug!(params = %self.params, samples = samples.len(), "pipeline fitted");
        Ok(FittedPipeline {
            params: self.params,
            deskew,
            pca,
            knn,
        })
    }
}

/// A trained pipeline. Immutable: every method takes `&self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    params: Hyperparams,
    deskew: Deskew,
    pca: Pca,
    knn: Knn,
}

impl FittedPipeline {
    pub fn params(&self) -> Hyperparams {
        self.params
    }

    pub fn pca(&self) -> &Pca {
        &self.pca
    }

    pub fn knn(&self) -> &Knn {
        &self.knn
    }

    /// Check a deserialized pipeline for internal consistency, so a loaded
    /// model can predict without panicking.
    pub fn validate(&self) -> Result<(), AppError> {
        self.pca.validate().map_err(AppError::model_load)?;
        self.knn.validate(self.pca.n_components()).map_err(AppError::model_load)?;

        let stored = Hyperparams {
            pca_components: self.pca.n_components(),
            neighbors: self.knn.neighbors(),
            weighting: self.knn.weighting(),
        };
        if stored != self.params {
            return Err(AppError::model_load(format!(
                "Pipeline stages ({stored}) disagree with its hyperparameters ({}).",
                self.params
            )));
        }
        Ok(())
    }

    /// Predict the digit of a single sample.
    pub fn predict_one(&self, sample: &NormalizedSample) -> Digit {
        let upright = crate::preprocess::deskew(sample);
        self.knn.predict_one(&self.pca.project(&upright))
    }

    /// Accuracy of the pipeline on labeled samples.
    pub fn score(&self, samples: &[NormalizedSample], labels: &[Digit]) -> f64 {
        accuracy(&self.predict(samples), labels)
    }
}

impl Predict for FittedPipeline {
    type Input = NormalizedSample;

    fn predict(&self, samples: &[NormalizedSample]) -> Vec<Digit> {
        let upright = self.deskew.transform(samples);
        let embedded = self.pca.transform(&upright);
        self.knn.predict(&embedded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Weighting;

    /// Three well-separated blob "digits" with small positional jitter.
    fn blobs() -> (Vec<NormalizedSample>, Vec<Digit>) {
        let centers = [(6usize, 6usize, 1u8), (6, 20, 4), (20, 13, 8)];
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        for (cr, cc, label) in centers {
            for j in 0..6usize {
                let (dr, dc) = (j % 2, j / 2 % 2);
                samples.push(NormalizedSample::from_fn(|r, c| {
                    let (r0, c0) = (cr + dr, cc + dc);
                    if r.abs_diff(r0) <= 2 && c.abs_diff(c0) <= 2 { 255 } else { 0 }
                }));
                labels.push(Digit::new(label).unwrap());
            }
        }
        (samples, labels)
    }

    fn params(pca: usize, k: usize, weighting: Weighting) -> Hyperparams {
        Hyperparams {
            pca_components: pca,
            neighbors: k,
            weighting,
        }
    }

    #[test]
    fn fit_then_predict_beats_majority_baseline() {
        let (samples, labels) = blobs();
        let fitted = ClassificationPipeline::new(params(5, 3, Weighting::Uniform))
            .fit(&samples, &labels)
            .unwrap();

        let acc = fitted.score(&samples, &labels);
        let majority = 6.0 / 18.0;
        assert!(acc > majority, "accuracy {acc} <= majority baseline {majority}");
        assert_eq!(fitted.predict(&samples).len(), samples.len());
    }

    #[test]
    fn predict_one_agrees_with_batch_predict() {
        let (samples, labels) = blobs();
        let fitted = ClassificationPipeline::new(params(4, 1, Weighting::Distance))
            .fit(&samples, &labels)
            .unwrap();
        let batch = fitted.predict(&samples);
        for (s, p) in samples.iter().zip(batch) {
            assert_eq!(fitted.predict_one(s), p);
        }
    }

    #[test]
    fn fitted_pipeline_validates() {
        let (samples, labels) = blobs();
        let fitted = ClassificationPipeline::new(params(3, 2, Weighting::Uniform))
            .fit(&samples, &labels)
            .unwrap();
        assert!(fitted.validate().is_ok());

        let mut relabeled = fitted;
        relabeled.params.neighbors = 5;
        assert_eq!(
            relabeled.validate().unwrap_err().kind(),
            crate::error::ErrorKind::ModelLoad
        );
    }

    #[test]
    fn invalid_hyperparams_fail_to_fit() {
        let (samples, labels) = blobs();
        let err = ClassificationPipeline::new(params(5, 100, Weighting::Uniform))
            .fit(&samples, &labels)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Fit);

        assert!(
            ClassificationPipeline::new(params(5, 1, Weighting::Uniform))
                .fit(&samples, &labels[..3])
                .is_err()
        );
    }
}
