use crate::audit::Rotation;
use crate::model::VectorizerParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/phish-sentinel.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `model.json` and `vectorizer.json`.
    pub artifact_dir: String,
    pub audit: AuditConfig,
    /// Rule or model score at or above which an alert is raised.
    pub alert_threshold: f64,
    pub explain_top_n: usize,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub path: String,
    pub max_bytes: u64,
    pub backup_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub ngram_min: usize,
    pub ngram_max: usize,
    pub max_features: usize,
    pub test_fraction: f64,
    pub seed: u64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Inverse L2 regularization strength.
    pub l2_c: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifact_dir: "artifacts".to_string(),
            audit: AuditConfig::default(),
            alert_threshold: 0.6,
            explain_top_n: 10,
            training: TrainingConfig::default(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        let rotation = Rotation::default();
        Self {
            path: "detections.log".to_string(),
            max_bytes: rotation.max_bytes,
            backup_count: rotation.backup_count,
        }
    }
}

impl AuditConfig {
    pub fn rotation(&self) -> Rotation {
        Rotation {
            max_bytes: self.max_bytes,
            backup_count: self.backup_count,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let vectorizer = VectorizerParams::default();
        Self {
            ngram_min: vectorizer.ngram_min,
            ngram_max: vectorizer.ngram_max,
            max_features: vectorizer.max_features,
            test_fraction: 0.25,
            seed: 42,
            max_iter: 1000,
            learning_rate: 0.5,
            l2_c: 1.0,
        }
    }
}

impl TrainingConfig {
    pub fn vectorizer_params(&self) -> VectorizerParams {
        VectorizerParams {
            ngram_min: self.ngram_min,
            ngram_max: self.ngram_max,
            max_features: self.max_features,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.alert_threshold) {
            anyhow::bail!("alert_threshold {} not in [0, 1]", self.alert_threshold);
        }
        let t = &self.training;
        if t.ngram_min == 0 || t.ngram_min > t.ngram_max {
            anyhow::bail!("invalid n-gram range {}..={}", t.ngram_min, t.ngram_max);
        }
        if t.max_features == 0 {
            anyhow::bail!("max_features must be positive");
        }
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            anyhow::bail!("test_fraction {} not in (0, 1)", t.test_fraction);
        }
        if !(t.learning_rate > 0.0) || !(t.l2_c > 0.0) {
            anyhow::bail!("learning_rate and l2_c must be positive");
        }
        Ok(())
    }
}

/// Read `path`, or fall back to defaults when it does not exist.
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.artifact_dir, "artifacts");
        assert_eq!(config.audit.max_bytes, 5_000_000);
        assert_eq!(config.audit.backup_count, 3);
        assert_eq!(config.alert_threshold, 0.6);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.max_features, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str(
            "alert_threshold: 0.8\naudit:\n  path: /tmp/x.log\ntraining:\n  seed: 7\n",
        )
        .unwrap();

        assert_eq!(config.alert_threshold, 0.8);
        assert_eq!(config.audit.path, "/tmp/x.log");
        assert_eq!(config.audit.backup_count, 3);
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.ngram_max, 5);
        assert_eq!(config.explain_top_n, 10);
    }

    #[test]
    fn test_generated_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phish-sentinel.yaml");
        let path = path.to_str().unwrap();

        Config::default().to_file(path).unwrap();
        let loaded = load_config(path).unwrap();
        assert_eq!(loaded.explain_top_n, 10);
        assert_eq!(loaded.training.test_fraction, 0.25);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config("/nonexistent/phish-sentinel.yaml").unwrap();
        assert_eq!(config.artifact_dir, "artifacts");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "training:\n  ngram_min: 6\n  ngram_max: 3\n").unwrap();

        assert!(Config::from_file(path.to_str().unwrap()).is_err());
    }
}
