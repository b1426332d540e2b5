use std::path::PathBuf;

/// Failures surfaced by the detection engine.
///
/// Heuristic extraction and rule scoring never produce these; only the
/// model-backed paths (loading, composing, training) do.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Model artifacts not found at {}. Run training first to create them.", path.display())]
    ArtifactsNotFound { path: PathBuf },
    #[error("Model artifact {} is unusable: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },
    #[error("Feature schema mismatch: expected {expected} columns, got {got}")]
    SchemaMismatch { expected: usize, got: usize },
    #[error("Cannot explain prediction: {0}")]
    Explanation(String),
    #[error("Training data error: {0}")]
    TrainingData(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DetectorError {
    pub fn is_missing_artifacts(&self) -> bool {
        matches!(self, DetectorError::ArtifactsNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;
