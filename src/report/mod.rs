//! Reporting utilities: held-out evaluation and confusion matrices.

pub mod format;

pub use format::*;

use crate::domain::Digit;
use crate::models::accuracy;

/// Rows are expected digits, columns predicted digits.
pub type ConfusionMatrix = [[usize; Digit::COUNT]; Digit::COUNT];

/// Held-out performance of a fitted pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub n: usize,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
}

/// Tabulate held-out predictions against their expected labels.
pub fn evaluate_predictions(predicted: &[Digit], labels: &[Digit]) -> Evaluation {
    Evaluation {
        n: labels.len(),
        accuracy: accuracy(predicted, labels),
        confusion: confusion_matrix(predicted, labels),
    }
}

pub fn confusion_matrix(predicted: &[Digit], expected: &[Digit]) -> ConfusionMatrix {
    let mut m = [[0usize; Digit::COUNT]; Digit::COUNT];
    for (p, e) in predicted.iter().zip(expected) {
        m[e.index()][p.index()] += 1;
    }
    m
}

/// Recall per expected digit (`None` for digits absent from the test set).
pub fn per_class_recall(confusion: &ConfusionMatrix) -> [Option<f64>; Digit::COUNT] {
    let mut out = [None; Digit::COUNT];
    for (d, row) in confusion.iter().enumerate() {
        let total: usize = row.iter().sum();
        if total > 0 {
            out[d] = Some(row[d] as f64 / total as f64);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(values: &[u8]) -> Vec<Digit> {
        values.iter().map(|&v| Digit::new(v).unwrap()).collect()
    }

    #[test]
    fn confusion_counts_expected_by_predicted() {
        let m = confusion_matrix(&digits(&[1, 1, 2, 7]), &digits(&[1, 2, 2, 1]));
        assert_eq!(m[1][1], 1);
        assert_eq!(m[2][1], 1);
        assert_eq!(m[2][2], 1);
        assert_eq!(m[1][7], 1);
        assert_eq!(m.iter().flatten().sum::<usize>(), 4);

        let recall = per_class_recall(&m);
        assert_eq!(recall[1], Some(0.5));
        assert_eq!(recall[2], Some(0.5));
        assert_eq!(recall[0], None);
    }

    #[test]
    fn evaluation_summarizes_predictions() {
        let eval = evaluate_predictions(&digits(&[3, 3, 5, 0]), &digits(&[3, 8, 5, 0]));
        assert_eq!(eval.n, 4);
        assert!((eval.accuracy - 0.75).abs() < 1e-12);
        assert_eq!(eval.confusion[8][3], 1);
        assert_eq!(eval.confusion.iter().flatten().sum::<usize>(), 4);
    }
}
