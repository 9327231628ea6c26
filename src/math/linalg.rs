//! Covariance accumulation and eigen-decomposition for PCA.
//!
//! In this project we repeatedly fit PCA on a few hundred thousand 784-wide
//! rows (once per CV fold and grid combination), so:
//! - rows are accumulated in fixed-size blocks and multiplied with nalgebra's
//!   GEMM (`Bᵀ B`) instead of summing per-row outer products
//! - rows are split into a fixed number of groups processed in parallel;
//!   group partial sums are added in group order, so the result is
//!   bit-identical for any thread count
//! - the eigen problem is always `d × d` (784 here), independent of `n`

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rayon::prelude::*;

/// Rows per GEMM block.
const BLOCK_ROWS: usize = 512;

/// Parallel groups per accumulation.
const GROUPS: usize = 16;

fn group_len(n: usize) -> usize {
    n.div_ceil(GROUPS).max(1)
}

/// Per-column mean of `rows` (each of length `dim`).
pub fn column_means<R: AsRef<[u8]> + Sync>(rows: &[R], dim: usize) -> DVector<f64> {
    let partials: Vec<Vec<f64>> = rows
        .par_chunks(group_len(rows.len()))
        .map(|group| {
            let mut acc = vec![0.0f64; dim];
            for row in group {
                for (a, &v) in acc.iter_mut().zip(row.as_ref()) {
                    *a += v as f64;
                }
            }
            acc
        })
        .collect();

    let mut sums = vec![0.0f64; dim];
    for p in partials {
        for (x, y) in sums.iter_mut().zip(p) {
            *x += y;
        }
    }

    let n = rows.len().max(1) as f64;
    DVector::from_iterator(dim, sums.into_iter().map(|s| s / n))
}

/// Sample covariance (`n - 1` denominator) of `rows` around `mean`.
///
/// Returns a zero matrix when fewer than two rows are given.
pub fn covariance<R: AsRef<[u8]> + Sync>(rows: &[R], mean: &DVector<f64>) -> DMatrix<f64> {
    let dim = mean.len();
    if rows.len() < 2 {
        return DMatrix::zeros(dim, dim);
    }

    let partials: Vec<DMatrix<f64>> = rows
        .par_chunks(group_len(rows.len()))
        .map(|group| {
            let mut acc = DMatrix::zeros(dim, dim);
            for block in group.chunks(BLOCK_ROWS) {
                let centered = DMatrix::from_fn(block.len(), dim, |i, j| {
                    block[i].as_ref()[j] as f64 - mean[j]
                });
                acc += centered.transpose() * &centered;
            }
            acc
        })
        .collect();

    let mut scatter = DMatrix::zeros(dim, dim);
    for p in partials {
        scatter += p;
    }

    scatter / (rows.len() as f64 - 1.0)
}

/// Top-`k` principal axes of a symmetric covariance matrix.
///
/// Returns `(components, eigenvalues)` where `components` is `k × d` with one
/// unit-length axis per row, ordered by descending eigenvalue (ties broken by
/// eigen index). Each axis is sign-normalized so its largest-magnitude entry is
/// positive, making the basis deterministic.
pub fn principal_axes(cov: &DMatrix<f64>, k: usize) -> (DMatrix<f64>, Vec<f64>) {
    let dim = cov.nrows();
    let k = k.min(dim);
    let eigen = SymmetricEigen::new(cov.clone());

    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut components = DMatrix::zeros(k, dim);
    let mut values = Vec::with_capacity(k);
    for (row, &idx) in order.iter().take(k).enumerate() {
        let axis = eigen.eigenvectors.column(idx);
        let pivot = axis
            .iter()
            .copied()
            .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for j in 0..dim {
            components[(row, j)] = axis[j] * sign;
        }
        // Tiny negative eigenvalues are round-off on a PSD matrix.
        values.push(eigen.eigenvalues[idx].max(0.0));
    }

    (components, values)
}
