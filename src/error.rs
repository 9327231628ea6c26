/// Broad category of an [`AppError`].
///
/// The category decides the process exit code and lets callers tell a bad
/// upload apart from a broken training run without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input raster could not be decoded or has no ink.
    InvalidImage,
    /// The model artifact is missing, unreadable or malformed.
    ModelLoad,
    /// The labeled corpus (or its train/test partition) is unusable.
    TrainingData,
    /// No hyperparameter combination finished cross-validation.
    SearchExhaustion,
    /// A CLI flag or environment value is invalid.
    Config,
    /// Writing an artifact or report failed.
    Io,
    /// A pipeline stage cannot be fitted on the data it was given.
    Fit,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidImage => 2,
            ErrorKind::ModelLoad => 3,
            ErrorKind::TrainingData => 4,
            ErrorKind::SearchExhaustion => 5,
            ErrorKind::Config => 6,
            ErrorKind::Io => 7,
            ErrorKind::Fit => 8,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidImage, message)
    }

    pub fn model_load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelLoad, message)
    }

    pub fn training_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TrainingData, message)
    }

    pub fn search_exhaustion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SearchExhaustion, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn fit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fit, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        let kinds = [
            ErrorKind::InvalidImage,
            ErrorKind::ModelLoad,
            ErrorKind::TrainingData,
            ErrorKind::SearchExhaustion,
            ErrorKind::Config,
            ErrorKind::Io,
            ErrorKind::Fit,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|&c| c != 0));
    }

    #[test]
    fn display_is_the_bare_message() {
        let err = AppError::model_load("Model artifact 'x.json' not found.");
        assert_eq!(err.to_string(), "Model artifact 'x.json' not found.");
        assert_eq!(err.kind(), ErrorKind::ModelLoad);
        assert_eq!(err.exit_code(), 3);
    }
}
