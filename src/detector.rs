use crate::error::Result;
use crate::explain::{Contribution, Explainer};
use crate::model::{compose, feature_names, ArtifactStore, Artifacts};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub url: String,
    pub phishing_prob: f64,
    pub label: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub url: String,
    pub top_positive: Vec<Contribution>,
    pub top_negative: Vec<Contribution>,
    pub method: String,
}

/// Model-backed URL scoring over a loaded artifact pair.
///
/// Cloning shares the same artifacts; nothing here mutates them, so one
/// detector can serve any number of threads.
#[derive(Debug, Clone)]
pub struct Detector {
    artifacts: Arc<Artifacts>,
}

impl Detector {
    /// Load artifacts from `store`. A missing pair is reported as-is.
    pub fn load(store: &dyn ArtifactStore) -> Result<Self> {
        Ok(Self::from_artifacts(store.load()?))
    }

    pub fn from_artifacts(artifacts: Artifacts) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn predict_url(&self, url: &str) -> Result<Prediction> {
        let model = self.artifacts.classifier();
        let row = compose(&model.schema, self.artifacts.vectorizer(), url)?;
        let phishing_prob = model.predict_proba(&row)?;
        let label = model.predict_label(phishing_prob);
        log::debug!(
            "{} -> p={:.4} label={} ({} lexical hits)",
            url,
            phishing_prob,
            label,
            row.lexical.nnz()
        );

        Ok(Prediction {
            url: url.to_string(),
            phishing_prob,
            label,
        })
    }

    pub fn predict_batch<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<Prediction>> {
        urls.iter().map(|url| self.predict_url(url.as_ref())).collect()
    }

    pub fn explain_url(&self, url: &str, top_n: usize) -> Result<Explanation> {
        let model = self.artifacts.classifier();
        let vectorizer = self.artifacts.vectorizer();
        let row = compose(&model.schema, vectorizer, url)?;
        let names = feature_names(&model.schema, vectorizer);

        let ranking = Explainer::for_model(model, top_n).explain(model, &names, &row.to_dense())?;
        Ok(Explanation {
            url: url.to_string(),
            top_positive: ranking.top_positive,
            top_negative: ranking.top_negative,
            method: ranking.method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectorError;
    use crate::model::{FeatureSchema, FileArtifactStore, LogisticModel, TfidfVectorizer, VectorizerParams};

    /// Lexical weights zero; only `has_ip` (column lexical + 6) matters.
    fn ip_sensitive_detector() -> Detector {
        let vectorizer = TfidfVectorizer::fit(
            &["http://example.com/login", "http://10.0.0.1/verify"],
            VectorizerParams::default(),
        )
        .unwrap();
        let schema = FeatureSchema::new(vectorizer.vocabulary_size());
        let mut coefficients = vec![0.0; schema.width()];
        coefficients[schema.lexical_width + 6] = 4.0;
        let classifier = LogisticModel {
            model_id: "ip".to_string(),
            schema,
            coefficients,
            intercept: -2.0,
            threshold: 0.5,
            feature_means: None,
        };
        Detector::from_artifacts(Artifacts::new(classifier, vectorizer).unwrap())
    }

    #[test]
    fn test_predict_url() {
        let detector = ip_sensitive_detector();

        let ip = detector.predict_url("http://192.168.1.1/secure").unwrap();
        assert_eq!(ip.label, 1);
        assert!(ip.phishing_prob > 0.85);

        let plain = detector.predict_url("https://example.com").unwrap();
        assert_eq!(plain.label, 0);
        assert!(plain.phishing_prob < 0.2);
        assert_eq!(plain.url, "https://example.com");
    }

    #[test]
    fn test_predict_accepts_unusual_input() {
        let detector = ip_sensitive_detector();
        for url in ["", "   ", "not a url", "ftp://x", "http://паypal.com"] {
            let p = detector.predict_url(url).unwrap();
            assert!((0.0..=1.0).contains(&p.phishing_prob));
        }
    }

    #[test]
    fn test_explain_names_the_ip_column() {
        let detector = ip_sensitive_detector();
        let explanation = detector.explain_url("http://192.168.1.1/secure", 3).unwrap();

        assert_eq!(explanation.top_positive.len(), 3);
        assert_eq!(explanation.top_negative.len(), 3);
        assert_eq!(explanation.top_positive[0].feature, "has_ip");
        assert!((explanation.top_positive[0].contribution - 4.0).abs() < 1e-9);
        assert_eq!(explanation.method, "occlusion");
    }

    #[test]
    fn test_missing_artifacts_surface() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path().join("none"));
        let err = Detector::load(&store).unwrap_err();
        assert!(matches!(err, DetectorError::ArtifactsNotFound { .. }));
    }

    #[test]
    fn test_shared_across_threads() {
        let detector = ip_sensitive_detector();
        let expected = detector.predict_url("http://10.1.2.3/a").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let detector = detector.clone();
                std::thread::spawn(move || {
                    (0..20)
                        .map(|_| detector.predict_url("http://10.1.2.3/a").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for prediction in handle.join().unwrap() {
                assert_eq!(prediction, expected);
            }
        }
    }
}
