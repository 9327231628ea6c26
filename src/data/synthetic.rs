//! Deterministic synthetic handwritten-style digits.
//!
//! Each digit class has a stroke template (polylines in unit coordinates,
//! `x` to the right and `y` down). A sample is produced by jittering the
//! template (rotation, shear, scale, translation, per-vertex noise, pen
//! width), drawing it dark-on-white like a scanned bitmap, and sending the
//! bitmap through the regular normalizer. The whole corpus is a function of
//! the seed.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rayon::prelude::*;
use tracing::info;

use crate::data::DatasetSource;
use crate::domain::{Dataset, Digit, LabeledSample};
use crate::error::AppError;
use crate::preprocess::normalize_gray;

/// A polyline.
pub type Stroke = Vec<(f64, f64)>;

const CANVAS: u32 = 72;
const INK: Luma<u8> = Luma([0]);
/// Side of the box the unit template is scaled into before jitter.
const TEMPLATE_BOX: f64 = 40.0;

/// Synthetic corpus generator.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    pub per_class: usize,
    /// Fraction of each class placed after the split point.
    pub test_fraction: f64,
    pub seed: u64,
}

impl SyntheticSource {
    pub fn new(per_class: usize, seed: u64) -> Self {
        Self {
            per_class,
            test_fraction: 0.2,
            seed,
        }
    }

    fn test_per_class(&self) -> usize {
        let n = (self.per_class as f64 * self.test_fraction).round() as usize;
        n.clamp(1, self.per_class.saturating_sub(1).max(1))
    }
}

impl DatasetSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load_dataset(&self) -> Result<Dataset, AppError> {
        if self.per_class < 2 {
            return Err(AppError::training_data(format!(
                "Synthetic corpus needs at least 2 samples per class (got {}).",
                self.per_class
            )));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(AppError::training_data(format!(
                "Synthetic test fraction must be in (0, 1) (got {}).",
                self.test_fraction
            )));
        }

        let test_pc = self.test_per_class();
        let train_pc = self.per_class - test_pc;

        // Jitter is drawn sequentially so the corpus only depends on the seed;
        // rendering and normalization then run in parallel.
        let mut rng = StdRng::seed_from_u64(self.seed);
        let jitter = JitterModel::new()?;
        let mut plans = Vec::with_capacity(self.per_class * Digit::COUNT);
        for i in 0..self.per_class {
            for digit in Digit::all() {
                let (strokes, thickness) = jitter.apply(&digit_template(digit), &mut rng);
                plans.push((i, digit, strokes, thickness));
            }
        }

        let rendered: Vec<(usize, LabeledSample)> = plans
            .into_par_iter()
            .map(|(i, digit, strokes, thickness)| {
                let img = draw_strokes(&strokes, CANVAS, CANVAS, thickness);
                let sample = normalize_gray(&img).map_err(|e| {
                    AppError::training_data(format!("Synthetic digit {digit} #{i} failed to normalize: {e}"))
                })?;
                Ok((i, LabeledSample { sample, label: digit }))
            })
            .collect::<Result<_, AppError>>()?;

        let (mut samples, test): (Vec<_>, Vec<_>) =
            rendered.into_iter().partition(|(i, _)| *i < train_pc);
        let split_point = samples.len();
        samples.extend(test);
        let samples: Vec<LabeledSample> = samples.into_iter().map(|(_, s)| s).collect();

        info!(
            train = split_point,
            test = samples.len() - split_point,
            seed = self.seed,
            "generated synthetic digits"
        );
        Ok(Dataset {
            samples,
            split_point,
        })
    }
}

/// Random deformation applied to a template.
struct JitterModel {
    angle: Normal<f64>,
    shear: Normal<f64>,
    vertex: Normal<f64>,
}

impl JitterModel {
    fn new() -> Result<Self, AppError> {
        let normal = |sd: f64| {
            Normal::new(0.0, sd)
                .map_err(|e| AppError::training_data(format!("Jitter distribution error: {e}")))
        };
        Ok(Self {
            angle: normal(0.08)?,
            shear: normal(0.12)?,
            vertex: normal(0.015)?,
        })
    }

    /// Map a unit-coordinate template to jittered canvas coordinates.
    fn apply(&self, template: &[Stroke], rng: &mut StdRng) -> (Vec<Stroke>, f64) {
        let angle = self.angle.sample(rng).clamp(-0.25, 0.25);
        let shear = self.shear.sample(rng).clamp(-0.35, 0.35);
        let sx = rng.gen_range(0.75..1.1);
        let sy = rng.gen_range(0.85..1.1);
        let dx = rng.gen_range(-3.0..3.0);
        let dy = rng.gen_range(-3.0..3.0);
        let thickness = rng.gen_range(4.0..7.5);

        let (sin, cos) = angle.sin_cos();
        let center = CANVAS as f64 / 2.0;
        let strokes = template
            .iter()
            .map(|stroke| {
                stroke
                    .iter()
                    .map(|&(x, y)| {
                        let x = x - 0.5 + self.vertex.sample(rng);
                        let y = y - 0.5 + self.vertex.sample(rng);
                        let (u, v) = (sx * x + shear * sy * y, sy * y);
                        let (u, v) = (cos * u - sin * v, sin * u + cos * v);
                        (center + dx + u * TEMPLATE_BOX, center + dy + v * TEMPLATE_BOX)
                    })
                    .collect()
            })
            .collect();
        (strokes, thickness)
    }
}

/// Points along an elliptical arc; angles in degrees, 0 = right, 90 = down.
fn arc(cx: f64, cy: f64, rx: f64, ry: f64, from: f64, to: f64) -> Stroke {
    let steps = (((to - from).abs() / 15.0).ceil() as usize).max(2);
    (0..=steps)
        .map(|i| {
            let t = (from + (to - from) * i as f64 / steps as f64).to_radians();
            (cx + rx * t.cos(), cy + ry * t.sin())
        })
        .collect()
}

/// Stroke template of a digit in unit coordinates.
pub fn digit_template(digit: Digit) -> Vec<Stroke> {
    match digit.value() {
        0 => vec![arc(0.5, 0.5, 0.3, 0.45, 0.0, 360.0)],
        1 => vec![vec![(0.3, 0.22), (0.55, 0.05), (0.55, 0.95)]],
        2 => {
            let mut s = arc(0.5, 0.3, 0.3, 0.25, 180.0, 360.0);
            s.extend([(0.2, 0.95), (0.85, 0.95)]);
            vec![s]
        }
        3 => vec![
            arc(0.5, 0.27, 0.28, 0.22, 200.0, 450.0),
            arc(0.5, 0.72, 0.32, 0.23, 270.0, 520.0),
        ],
        4 => vec![vec![(0.65, 0.95), (0.65, 0.05), (0.12, 0.65), (0.9, 0.65)]],
        5 => {
            let mut s = vec![(0.8, 0.05), (0.3, 0.05), (0.3, 0.45)];
            s.extend(arc(0.5, 0.66, 0.3, 0.28, 230.0, 510.0));
            vec![s]
        }
        6 => {
            let mut s = arc(0.55, 0.55, 0.35, 0.5, 280.0, 180.0);
            s.extend(arc(0.5, 0.7, 0.3, 0.25, 180.0, 540.0));
            vec![s]
        }
        7 => vec![vec![(0.15, 0.05), (0.85, 0.05), (0.4, 0.95)]],
        8 => vec![
            arc(0.5, 0.27, 0.25, 0.22, 0.0, 360.0),
            arc(0.5, 0.72, 0.3, 0.23, 0.0, 360.0),
        ],
        _ => {
            let mut s = arc(0.5, 0.3, 0.3, 0.25, 0.0, 360.0);
            s.extend([(0.8, 0.3), (0.75, 0.95)]);
            vec![s]
        }
    }
}

/// Draw polylines (canvas coordinates) in black with a round pen of the given
/// width on a white `width`×`height` canvas. Parts outside are clipped.
///
/// The pen is a filled circle stamped every half pixel along each segment.
pub fn draw_strokes(strokes: &[Stroke], width: u32, height: u32, thickness: f64) -> GrayImage {
    let mut img = GrayImage::from_pixel(width, height, Luma([255]));
    let radius = ((thickness / 2.0).round() as i32).max(1);
    let mut stamp = |x: f64, y: f64| {
        draw_filled_circle_mut(&mut img, (x.round() as i32, y.round() as i32), radius, INK);
    };
    for stroke in strokes {
        for seg in stroke.windows(2) {
            let ((x0, y0), (x1, y1)) = (seg[0], seg[1]);
            let len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
            let steps = ((len / 0.5).ceil() as usize).max(1);
            for i in 0..=steps {
                let t = i as f64 / steps as f64;
                stamp(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
            }
        }
        if let [(x, y)] = stroke.as_slice() {
            stamp(*x, *y);
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_is_deterministic_and_balanced() {
        let src = SyntheticSource::new(5, 11);
        let a = src.load_dataset().unwrap();
        let b = src.load_dataset().unwrap();
        assert_eq!(a.samples, b.samples);

        assert_eq!(a.samples.len(), 50);
        assert_eq!(a.split_point, 40);
        for digit in Digit::all() {
            let n = a.samples[a.split_point..]
                .iter()
                .filter(|s| s.label == digit)
                .count();
            assert_eq!(n, 1);
        }
    }

    #[test]
    fn different_seeds_give_different_corpora() {
        let a = SyntheticSource::new(3, 1).load_dataset().unwrap();
        let b = SyntheticSource::new(3, 2).load_dataset().unwrap();
        assert_ne!(a.samples, b.samples);
    }

    #[test]
    fn too_small_corpus_is_rejected() {
        let err = SyntheticSource::new(1, 0).load_dataset().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TrainingData);
    }

    #[test]
    fn draw_strokes_inks_along_the_line() {
        let img = draw_strokes(&[vec![(10.0, 20.0), (30.0, 20.0)]], 40, 40, 4.0);
        assert_eq!(img.get_pixel(20, 20)[0], 0);
        assert_eq!(img.get_pixel(20, 5)[0], 255);
        // Out-of-canvas strokes are clipped.
        let img = draw_strokes(&[vec![(-10.0, -10.0), (100.0, 100.0)]], 20, 20, 2.0);
        assert_eq!(img.get_pixel(10, 10)[0], 0);
    }

    #[test]
    fn single_point_stroke_leaves_a_dot_of_pen_width() {
        let img = draw_strokes(&[vec![(10.0, 10.0)]], 20, 20, 6.0);
        assert_eq!(img.get_pixel(10, 10)[0], 0);
        assert_eq!(img.get_pixel(13, 10)[0], 0);
        assert_eq!(img.get_pixel(15, 10)[0], 255);
        assert_eq!(img.get_pixel(10, 18)[0], 255);
    }

    #[test]
    fn every_template_normalizes() {
        for digit in Digit::all() {
            let strokes: Vec<Stroke> = digit_template(digit)
                .into_iter()
                .map(|s| s.into_iter().map(|(x, y)| (10.0 + 40.0 * x, 10.0 + 40.0 * y)).collect())
                .collect();
            let img = draw_strokes(&strokes, 60, 60, 5.0);
            assert!(normalize_gray(&img).is_ok(), "digit {digit}");
        }
    }
}
