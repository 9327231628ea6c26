//! Inference facade: raw image bytes in, [`RecognitionResult`] out.

use tracing::{debug, warn};

use crate::domain::{NormalizedSample, RecognitionResult};
use crate::io::ModelHandle;
use crate::preprocess::normalize_bytes;

/// Recognizes digits against one shared, read-only pipeline.
///
/// Cloning is cheap (one `Arc` bump); clones may be used from any thread.
#[derive(Debug, Clone)]
pub struct Recognizer {
    model: ModelHandle,
}

impl Recognizer {
    pub fn new(model: ModelHandle) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Normalize an encoded raster and classify it.
    ///
    /// Images that cannot be normalized (undecodable, blank) yield
    /// [`RecognitionResult::Error`] without touching the pipeline.
    pub fn recognize(&self, bytes: &[u8]) -> RecognitionResult {
        match normalize_bytes(bytes) {
            Ok(sample) => self.recognize_sample(&sample),
            Err(err) => {
                warn!(error = %err, "image rejected");
                RecognitionResult::Error
            }
        }
    }

    /// Classify an already normalized sample.
    pub fn recognize_sample(&self, sample: &NormalizedSample) -> RecognitionResult {
        let digit = self.model.predict_one(sample);
        debug!(%digit, "recognized");
        RecognitionResult::Ok {
            value: digit.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use image::{DynamicImage, GrayImage, ImageFormat, Luma};

    use super::*;
    use crate::domain::{Digit, Hyperparams, Weighting};
    use crate::models::{ClassificationPipeline, Fit};

    /// Two classes: a horizontal bar (digit 1) and a vertical bar (digit 4).
    fn recognizer() -> Recognizer {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for j in 0..6usize {
            x.push(NormalizedSample::from_fn(|r, c| {
                if r.abs_diff(13 + j % 2) <= 1 && (4..24).contains(&c) { 255 } else { 0 }
            }));
            y.push(Digit::new(1).unwrap());
            x.push(NormalizedSample::from_fn(|r, c| {
                if c.abs_diff(13 + j % 2) <= 1 && (4..24).contains(&r) { 255 } else { 0 }
            }));
            y.push(Digit::new(4).unwrap());
        }
        let params = Hyperparams {
            pca_components: 2,
            neighbors: 3,
            weighting: Weighting::Uniform,
        };
        let fitted = ClassificationPipeline::new(params).fit(&x, &y).unwrap();
        Recognizer::new(Arc::new(fitted))
    }

    fn png(img: GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn recognizes_a_dark_stroke_on_white() {
        let img = GrayImage::from_fn(60, 60, |x, y| {
            if (10..50).contains(&y) && (28..33).contains(&x) { Luma([0]) } else { Luma([255]) }
        });
        assert_eq!(recognizer().recognize(&png(img)), RecognitionResult::Ok { value: 4 });
    }

    #[test]
    fn blank_and_garbage_inputs_are_errors() {
        let rec = recognizer();
        let blank = GrayImage::from_pixel(50, 50, Luma([255]));
        assert_eq!(rec.recognize(&png(blank)), RecognitionResult::Error);
        assert_eq!(rec.recognize(b"not an image"), RecognitionResult::Error);
    }

    #[test]
    fn clones_share_the_model() {
        let rec = recognizer();
        let other = rec.clone();
        assert!(Arc::ptr_eq(rec.model(), other.model()));
    }
}
