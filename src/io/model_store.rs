//! Read/write the model artifact.
//!
//! The artifact is one JSON file: a small envelope (format version, training
//! timestamp, chosen hyperparameters, CV accuracy) around the fitted
//! pipeline. Floats are written with exact round-tripping, so a reloaded
//! pipeline predicts bit-for-bit like the one that was saved.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::Hyperparams;
use crate::error::AppError;
use crate::models::FittedPipeline;

pub const FORMAT_VERSION: u32 = 1;

/// Shared read-only handle to a loaded pipeline.
pub type ModelHandle = Arc<FittedPipeline>;

/// On-disk envelope of a trained pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub hyperparams: Hyperparams,
    /// Mean cross-validated accuracy of the chosen combination.
    pub cv_accuracy: f64,
    pub pipeline: FittedPipeline,
}

impl ModelArtifact {
    pub fn new(pipeline: FittedPipeline, cv_accuracy: f64) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            hyperparams: pipeline.params(),
            cv_accuracy,
            pipeline,
        }
    }

    pub fn into_handle(self) -> ModelHandle {
        Arc::new(self.pipeline)
    }
}

/// Write an artifact to `path`, creating parent directories.
///
/// The JSON goes to a sibling temporary file first and is renamed into
/// place, so readers never observe a half-written model.
pub fn save_model(artifact: &ModelArtifact, path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::io(format!("Failed to create model directory '{}': {e}", parent.display()))
        })?;
    }

    let tmp = temp_sibling(path);
    let file = File::create(&tmp)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", tmp.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, artifact)
        .map_err(|e| AppError::io(format!("Failed to write model JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write model JSON: {e}")))?;
    drop(writer);

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::io(format!("Failed to move model into '{}': {e}", path.display()))
    })?;

    info!(path = %path.display(), params = %artifact.hyperparams, "model saved");
    Ok(())
}

/// Read an artifact from `path`.
pub fn load_model(path: &Path) -> Result<ModelArtifact, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::model_load(format!("Failed to open model '{}': {e}", path.display())))?;
    let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::model_load(format!("Invalid model file '{}': {e}", path.display())))?;

    if artifact.format_version != FORMAT_VERSION {
        return Err(AppError::model_load(format!(
            "Unsupported model format version {} (expected {FORMAT_VERSION}).",
            artifact.format_version
        )));
    }
    if artifact.hyperparams != artifact.pipeline.params() {
        return Err(AppError::model_load(
            "Model envelope hyperparameters disagree with the stored pipeline.",
        ));
    }
    artifact
        .pipeline
        .validate()
        .map_err(|e| AppError::model_load(format!("Invalid model file '{}': {e}", path.display())))?;

    info!(
        path = %path.display(),
        params = %artifact.hyperparams,
        trained_at = %artifact.trained_at,
        "model loaded"
    );
    Ok(artifact)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Digit, NormalizedSample, Weighting};
    use crate::models::{ClassificationPipeline, Fit, Predict};

    fn trained() -> (FittedPipeline, Vec<NormalizedSample>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..12usize {
            let label = (i % 3) as u8;
            let c0 = 5 + 8 * label as usize + i % 2;
            x.push(NormalizedSample::from_fn(|r, c| {
                if c.abs_diff(c0) <= 1 && (4..24).contains(&r) { 200 + (i as u8) } else { 0 }
            }));
            y.push(Digit::new(label).unwrap());
        }
        let params = Hyperparams {
            pca_components: 3,
            neighbors: 3,
            weighting: Weighting::Distance,
        };
        (ClassificationPipeline::new(params).fit(&x, &y).unwrap(), x)
    }

    #[test]
    fn round_trip_preserves_predictions_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/model.json");
        let (pipeline, x) = trained();

        let artifact = ModelArtifact::new(pipeline.clone(), 0.9);
        save_model(&artifact, &path).unwrap();
        let loaded = load_model(&path).unwrap();

        assert_eq!(loaded, artifact);
        assert_eq!(loaded.pipeline.predict(&x), pipeline.predict(&x));
        assert_eq!(
            std::fs::read_dir(path.parent().unwrap()).unwrap().count(),
            1,
            "temporary file left behind"
        );
    }

    #[test]
    fn missing_and_corrupt_files_are_model_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_model(&dir.path().join("nope.json")).unwrap_err();
        assert_eq!(missing.kind(), crate::error::ErrorKind::ModelLoad);

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, b"{\"format_version\": 1").unwrap();
        assert_eq!(
            load_model(&corrupt).unwrap_err().kind(),
            crate::error::ErrorKind::ModelLoad
        );
    }

    #[test]
    fn unknown_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let (pipeline, _) = trained();
        let mut artifact = ModelArtifact::new(pipeline, 0.5);
        artifact.format_version = 99;
        save_model(&artifact, &path).unwrap();
        assert_eq!(
            load_model(&path).unwrap_err().kind(),
            crate::error::ErrorKind::ModelLoad
        );
    }

    /// Save a valid artifact, rewrite one part of its JSON, and reload it.
    fn load_edited(edit: impl FnOnce(&mut serde_json::Value)) -> Result<ModelArtifact, AppError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let (pipeline, _) = trained();
        save_model(&ModelArtifact::new(pipeline, 0.5), &path).unwrap();

        let mut json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        edit(&mut json["pipeline"]);
        std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();
        load_model(&path)
    }

    #[test]
    fn unedited_artifact_still_loads() {
        let loaded = load_edited(|_| {}).unwrap();
        let (_, x) = trained();
        assert_eq!(loaded.pipeline.predict(&x).len(), x.len());
    }

    #[test]
    fn inconsistent_pipelines_are_rejected_on_load() {
        let edits: [(&str, fn(&mut serde_json::Value)); 5] = [
            ("zero neighbors", |p| p["knn"]["neighbors"] = 0.into()),
            ("zero pca dim", |p| p["pca"]["dim"] = 0.into()),
            ("truncated labels", |p| {
                let labels = p["knn"]["labels"].as_array_mut().unwrap();
                labels.truncate(1);
            }),
            ("short mean", |p| {
                p["pca"]["mean"].as_array_mut().unwrap().pop();
            }),
            ("knn dim off by one", |p| {
                let dim = p["knn"]["dim"].as_u64().unwrap();
                p["knn"]["dim"] = (dim + 1).into();
            }),
        ];
        for (what, edit) in edits {
            let err = load_edited(edit).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::ModelLoad, "{what}");
        }
    }
}
