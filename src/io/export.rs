//! Export cross-validation results to CSV.
//!
//! One row per grid combination (failed ones included, with empty scores), so
//! the search can be inspected in a spreadsheet.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::fit::SearchOutcome;

/// Write per-combination CV results to a CSV file.
pub fn write_results_csv(path: &Path, outcome: &SearchOutcome) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results(&mut file, outcome)
}

/// Write the CSV body to any writer.
pub fn write_results(out: &mut impl Write, outcome: &SearchOutcome) -> Result<(), AppError> {
    let folds = outcome
        .scores
        .first()
        .map(|s| s.fold_scores.len())
        .unwrap_or(0);

    let mut header = String::from("index,pca_components,neighbors,weighting,status,rank,mean_accuracy,std_accuracy");
    for f in 0..folds {
        header.push_str(&format!(",fold_{f}"));
    }
    writeln!(out, "{header}").map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    let mut rows: Vec<(usize, String)> = Vec::with_capacity(outcome.scores.len() + outcome.failed.len());
    for s in &outcome.scores {
        let mut row = format!(
            "{},{},{},{},ok,{},{:.6},{:.6}",
            s.index,
            s.params.pca_components,
            s.params.neighbors,
            s.params.weighting.as_str(),
            s.rank,
            s.mean,
            s.std
        );
        for v in &s.fold_scores {
            row.push_str(&format!(",{v:.6}"));
        }
        rows.push((s.index, row));
    }
    for f in &outcome.failed {
        let mut row = format!(
            "{},{},{},{},failed,,,",
            f.index,
            f.params.pca_components,
            f.params.neighbors,
            f.params.weighting.as_str()
        );
        row.push_str(&",".repeat(folds));
        rows.push((f.index, row));
    }
    rows.sort_by_key(|(i, _)| *i);

    for (_, row) in rows {
        writeln!(out, "{row}").map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Digit, HyperparameterGrid, NormalizedSample, Weighting};
    use crate::fit::{SearchOptions, grid_search};

    #[test]
    fn csv_has_one_row_per_combination_in_enumeration_order() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..12usize {
            let label = (i % 2) as u8;
            let r0 = if label == 0 { 6 } else { 20 } + i % 3;
            x.push(NormalizedSample::from_fn(|r, c| {
                if r.abs_diff(r0) <= 1 && (6..22).contains(&c) { 255 } else { 0 }
            }));
            y.push(Digit::new(label).unwrap());
        }
        let grid = HyperparameterGrid {
            pca_components: vec![2, 400],
            neighbors: vec![1],
            weightings: vec![Weighting::Uniform],
        };
        let outcome = grid_search(&x, &y, &grid, &SearchOptions { folds: 2, jobs: Some(1) }).unwrap();

        let mut buf = Vec::new();
        write_results(&mut buf, &outcome).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("fold_0,fold_1"));
        assert!(lines[1].starts_with("0,2,1,uniform,ok,1,"));
        assert!(lines[2].starts_with("1,400,1,uniform,failed"));
        assert_eq!(lines[1].split(',').count(), lines[2].split(',').count());
    }
}
