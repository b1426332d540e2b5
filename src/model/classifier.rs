use super::composer::FeatureRow;
use super::schema::FeatureSchema;
use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};

/// Anything that maps a dense feature row to a positive-class probability.
///
/// Rows whose width differs from `input_width` are rejected.
pub trait ProbabilisticModel: Send + Sync {
    fn input_width(&self) -> usize;
    fn positive_probability(&self, x: &[f64]) -> Result<f64>;

    /// Per-column weights when the model is linear in its inputs.
    fn linear_coefficients(&self) -> Option<&[f64]> {
        None
    }
}

/// Linear logistic classifier: `p = σ(w·x + b)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Human-readable model identifier.
    pub model_id: String,
    pub schema: FeatureSchema,
    /// One weight per feature-row column.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Probability at or above which a URL is labelled phishing.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Per-column training means, used as the attribution baseline.
    #[serde(default)]
    pub feature_means: Option<Vec<f64>>,
}

fn default_threshold() -> f64 {
    0.5
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticModel {
    /// Validate that the model is structurally sound.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.schema.check_compatible()?;
        if self.coefficients.len() != self.schema.width() {
            return Err(format!(
                "coefficient dimension mismatch: expected {}, got {}",
                self.schema.width(),
                self.coefficients.len()
            ));
        }
        if let Some(i) = self.coefficients.iter().position(|w| !w.is_finite()) {
            return Err(format!(
                "non-finite coefficient at index {}: {}",
                i, self.coefficients[i]
            ));
        }
        if !self.intercept.is_finite() {
            return Err(format!("non-finite intercept: {}", self.intercept));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!("threshold {} not in [0, 1]", self.threshold));
        }
        if let Some(means) = &self.feature_means {
            if means.len() != self.coefficients.len() {
                return Err(format!(
                    "feature means dimension mismatch: expected {}, got {}",
                    self.coefficients.len(),
                    means.len()
                ));
            }
        }
        Ok(())
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn check_row(&self, row: &FeatureRow) -> Result<()> {
        self.schema.check_width(row.width())?;
        if row.lexical_width != self.schema.lexical_width
            || row.lexical.indices.len() != row.lexical.values.len()
        {
            return Err(DetectorError::SchemaMismatch {
                expected: self.schema.width(),
                got: row.width(),
            });
        }
        if let Some(&max) = row.lexical.indices.iter().max() {
            if max >= row.lexical_width {
                return Err(DetectorError::SchemaMismatch {
                    expected: self.schema.width(),
                    got: max + 1 + self.schema.heuristic_columns.len(),
                });
            }
        }
        Ok(())
    }

    /// `w·x + b` over a composed row, touching only non-zero lexical columns.
    pub fn decision_function(&self, row: &FeatureRow) -> Result<f64> {
        self.check_row(row)?;
        let lexical: f64 = row
            .lexical
            .iter()
            .map(|(i, v)| self.coefficients[i] * v)
            .sum();
        let offset = row.lexical_width;
        let heuristic: f64 = row
            .heuristics
            .iter()
            .enumerate()
            .map(|(j, v)| self.coefficients[offset + j] * v)
            .sum();
        Ok(self.intercept + lexical + heuristic)
    }

    pub fn predict_proba(&self, row: &FeatureRow) -> Result<f64> {
        Ok(sigmoid(self.decision_function(row)?))
    }

    pub fn predict_label(&self, probability: f64) -> u8 {
        (probability >= self.threshold) as u8
    }
}

impl ProbabilisticModel for LogisticModel {
    fn input_width(&self) -> usize {
        self.coefficients.len()
    }

    fn positive_probability(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.coefficients.len() {
            return Err(DetectorError::SchemaMismatch {
                expected: self.coefficients.len(),
                got: x.len(),
            });
        }
        let z: f64 = self
            .coefficients
            .iter()
            .zip(x.iter())
            .map(|(w, v)| w * v)
            .sum();
        Ok(sigmoid(z + self.intercept))
    }

    fn linear_coefficients(&self) -> Option<&[f64]> {
        Some(&self.coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vectorizer::LexicalVector;

    fn model(lexical_width: usize, coefficients: Vec<f64>, intercept: f64) -> LogisticModel {
        LogisticModel {
            model_id: "test".to_string(),
            schema: FeatureSchema::new(lexical_width),
            coefficients,
            intercept,
            threshold: 0.5,
            feature_means: None,
        }
    }

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(40.0) > 0.999);
        assert!(sigmoid(-40.0) < 0.001);
        assert!(sigmoid(-1000.0).is_finite());
    }

    #[test]
    fn test_sparse_and_dense_agree() {
        let mut coefficients = vec![0.5, -1.0];
        coefficients.extend([0.01, 0.3, 0.1, 0.2, 0.0, -0.4, 0.7, 0.05]);
        let m = model(2, coefficients, -0.2);

        let row = FeatureRow {
            lexical: LexicalVector {
                indices: vec![1],
                values: vec![0.8],
            },
            lexical_width: 2,
            heuristics: [20.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 4.0],
        };

        let sparse = m.predict_proba(&row).unwrap();
        let dense = m.positive_probability(&row.to_dense()).unwrap();
        assert!((sparse - dense).abs() < 1e-12);
    }

    #[test]
    fn test_rows_of_the_wrong_width_are_rejected() {
        let m = model(2, vec![0.1; 10], 0.0);

        // row from a wider vectorizer
        let wide = FeatureRow {
            lexical: LexicalVector {
                indices: vec![5],
                values: vec![1.0],
            },
            lexical_width: 6,
            heuristics: [0.0; 8],
        };
        assert!(matches!(
            m.predict_proba(&wide),
            Err(DetectorError::SchemaMismatch {
                expected: 10,
                got: 14
            })
        ));

        // right width, index outside the lexical block
        let stray = FeatureRow {
            lexical: LexicalVector {
                indices: vec![2],
                values: vec![1.0],
            },
            lexical_width: 2,
            heuristics: [0.0; 8],
        };
        assert!(m.decision_function(&stray).is_err());

        assert!(m.positive_probability(&[1.0; 3]).is_err());
        assert!(m.positive_probability(&[1.0; 11]).is_err());
        assert!(m.positive_probability(&[1.0; 10]).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_width() {
        let m = model(2, vec![0.0; 9], 0.0);
        assert!(m.validate().is_err());

        let m = model(2, vec![0.0; 10], 0.0);
        assert!(m.validate().is_ok());

        let m = model(2, vec![f64::NAN; 10], 0.0);
        assert!(m.validate().is_err());

        let mut m = model(2, vec![0.0; 10], 0.0);
        m.feature_means = Some(vec![0.0; 3]);
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_label_threshold() {
        let m = model(0, vec![0.0; 8], 0.0);
        assert_eq!(m.predict_label(0.5), 1);
        assert_eq!(m.predict_label(0.4999), 0);
    }
}
