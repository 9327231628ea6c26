//! Hyperparameter grid enumeration.
//!
//! We select PCA/kNN settings with an exhaustive, deterministic grid search:
//! - the enumeration order is fixed (PCA outer, neighbors, weighting inner)
//! - each combination carries its enumeration index, which later breaks ties
//! - duplicated candidate values are dropped (first occurrence kept)

use crate::domain::{HyperparameterGrid, Hyperparams, Weighting};
use crate::error::AppError;

/// Enumerate every combination of the grid in canonical order.
pub fn enumerate_grid(grid: &HyperparameterGrid) -> Result<Vec<Hyperparams>, AppError> {
    if grid.pca_components.is_empty() || grid.neighbors.is_empty() || grid.weightings.is_empty() {
        return Err(AppError::search_exhaustion(format!(
            "Hyperparameter grid is empty (pca={:?}, knn={:?}, weights={:?}).",
            grid.pca_components, grid.neighbors, grid.weightings
        )));
    }

    let pca = dedup_keep_first(&grid.pca_components);
    let neighbors = dedup_keep_first(&grid.neighbors);
    let weightings: Vec<Weighting> = dedup_keep_first(&grid.weightings);

    let mut out = Vec::with_capacity(pca.len() * neighbors.len() * weightings.len());
    for &pca_components in &pca {
        for &n in &neighbors {
            for &weighting in &weightings {
                out.push(Hyperparams {
                    pca_components,
                    neighbors: n,
                    weighting,
                });
            }
        }
    }
    Ok(out)
}

fn dedup_keep_first<T: PartialEq + Copy>(values: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(values.len());
    for &v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> HyperparameterGrid {
        HyperparameterGrid {
            pca_components: vec![35, 50],
            neighbors: vec![3, 5, 3],
            weightings: Weighting::ALL.to_vec(),
        }
    }

    #[test]
    fn enumeration_is_pca_outer_weighting_inner() {
        let combos = enumerate_grid(&grid()).unwrap();
        assert_eq!(combos.len(), 2 * 2 * 2);
        assert_eq!(
            combos[0],
            Hyperparams {
                pca_components: 35,
                neighbors: 3,
                weighting: Weighting::Uniform
            }
        );
        assert_eq!(combos[1].weighting, Weighting::Distance);
        assert_eq!(combos[2].neighbors, 5);
        assert_eq!(combos[4].pca_components, 50);
    }

    #[test]
    fn empty_axis_is_search_exhaustion() {
        let mut g = grid();
        g.neighbors.clear();
        let err = enumerate_grid(&g).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SearchExhaustion);
    }
}
