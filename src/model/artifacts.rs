use super::classifier::LogisticModel;
use super::vectorizer::TfidfVectorizer;
use crate::error::{DetectorError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const MODEL_FILE: &str = "model.json";
pub const VECTORIZER_FILE: &str = "vectorizer.json";

/// A fitted (classifier, vectorizer) pair that agrees on one feature schema.
#[derive(Debug, Clone)]
pub struct Artifacts {
    classifier: LogisticModel,
    vectorizer: TfidfVectorizer,
}

impl Artifacts {
    pub fn new(classifier: LogisticModel, vectorizer: TfidfVectorizer) -> Result<Self> {
        classifier
            .validate()
            .map_err(|reason| DetectorError::ArtifactCorrupt {
                path: PathBuf::from(MODEL_FILE),
                reason,
            })?;
        if classifier.schema.lexical_width != vectorizer.vocabulary_size() {
            return Err(DetectorError::SchemaMismatch {
                expected: classifier.schema.width(),
                got: vectorizer.vocabulary_size() + classifier.schema.heuristic_columns.len(),
            });
        }
        Ok(Self {
            classifier,
            vectorizer,
        })
    }

    pub fn classifier(&self) -> &LogisticModel {
        &self.classifier
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }
}

/// Source of fitted artifacts. Inference only ever calls `load`.
pub trait ArtifactStore: Send + Sync {
    fn load(&self) -> Result<Artifacts>;
    fn save(&self, artifacts: &Artifacts) -> Result<()>;
}

/// JSON artifacts in a directory: `model.json` and `vectorizer.json`.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn vectorizer_path(&self) -> PathBuf {
        self.dir.join(VECTORIZER_FILE)
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| DetectorError::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl ArtifactStore for FileArtifactStore {
    fn load(&self) -> Result<Artifacts> {
        let model_path = self.model_path();
        let vectorizer_path = self.vectorizer_path();

        for path in [&model_path, &vectorizer_path] {
            if !path.exists() {
                return Err(DetectorError::ArtifactsNotFound { path: path.clone() });
            }
        }

        let classifier: LogisticModel = Self::read_json(&model_path)?;
        let vectorizer: TfidfVectorizer = Self::read_json(&vectorizer_path)?;

        let artifacts = Artifacts::new(classifier, vectorizer).map_err(|e| match e {
            DetectorError::ArtifactCorrupt { reason, .. } => DetectorError::ArtifactCorrupt {
                path: model_path.clone(),
                reason,
            },
            other => other,
        })?;

        log::info!(
            "Loaded model '{}' ({} columns) from {}",
            artifacts.classifier.model_id,
            artifacts.classifier.schema.width(),
            self.dir.display()
        );
        Ok(artifacts)
    }

    fn save(&self, artifacts: &Artifacts) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(
            self.model_path(),
            serde_json::to_string_pretty(&artifacts.classifier)?,
        )?;
        fs::write(
            self.vectorizer_path(),
            serde_json::to_string(&artifacts.vectorizer)?,
        )?;
        log::info!("Saved model artifacts to {}", self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::FeatureSchema;
    use crate::model::vectorizer::VectorizerParams;

    fn tiny_artifacts() -> Artifacts {
        let vectorizer =
            TfidfVectorizer::fit(&["http://example.com"], VectorizerParams::default()).unwrap();
        let schema = FeatureSchema::new(vectorizer.vocabulary_size());
        let classifier = LogisticModel {
            model_id: "tiny".to_string(),
            coefficients: vec![0.1; schema.width()],
            schema,
            intercept: -1.0,
            threshold: 0.5,
            feature_means: None,
        };
        Artifacts::new(classifier, vectorizer).unwrap()
    }

    #[test]
    fn test_missing_artifacts_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        let err = store.load().unwrap_err();
        assert!(err.is_missing_artifacts());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path().join("artifacts"));
        let artifacts = tiny_artifacts();

        store.save(&artifacts).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.classifier().coefficients(), artifacts.classifier().coefficients());
        assert_eq!(
            loaded.vectorizer().feature_names(),
            artifacts.vectorizer().feature_names()
        );
    }

    #[test]
    fn test_corrupt_model_is_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        store.save(&tiny_artifacts()).unwrap();
        fs::write(store.model_path(), "{ not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, DetectorError::ArtifactCorrupt { .. }));
        assert!(!err.is_missing_artifacts());
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let artifacts = tiny_artifacts();
        let other =
            TfidfVectorizer::fit(&["https://another.example/path"], VectorizerParams::default())
                .unwrap();
        assert_ne!(other.vocabulary_size(), artifacts.vectorizer().vocabulary_size());

        let err = Artifacts::new(artifacts.classifier().clone(), other).unwrap_err();
        assert!(matches!(err, DetectorError::SchemaMismatch { .. }));
    }
}
