use crate::error::DetectorError;
use crate::model::ProbabilisticModel;

#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("row has {got} columns, model expects {expected}")]
    RowWidth { expected: usize, got: usize },
    #[error("baseline has {got} columns, row has {expected}")]
    BaselineWidth { expected: usize, got: usize },
    #[error("model output saturated at p = {0}")]
    Saturated(f64),
    #[error("model exposes no linear coefficients")]
    NotLinear,
    #[error(transparent)]
    Model(#[from] DetectorError),
}

/// Per-column attribution for one dense feature row.
pub trait AttributionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn attribute(
        &self,
        model: &dyn ProbabilisticModel,
        x: &[f64],
    ) -> Result<Vec<f64>, ExplainError>;
}

fn log_odds(p: f64) -> Result<f64, ExplainError> {
    if !(p > 0.0 && p < 1.0) {
        return Err(ExplainError::Saturated(p));
    }
    let z = (p / (1.0 - p)).ln();
    if z.is_finite() {
        Ok(z)
    } else {
        Err(ExplainError::Saturated(p))
    }
}

/// Occlusion attribution in log-odds space.
///
/// Column `i` is credited with `logit(f(x)) - logit(f(x with x_i = b_i))`
/// where `b` is the baseline row (training means when known, otherwise
/// zeros). Uses the model only as a black box. For a logistic model with
/// a mean baseline this equals the interventional Shapley value.
#[derive(Debug, Clone, Default)]
pub struct OcclusionAttribution {
    baseline: Option<Vec<f64>>,
}

impl OcclusionAttribution {
    pub fn with_baseline(baseline: Vec<f64>) -> Self {
        Self {
            baseline: Some(baseline),
        }
    }

    pub fn occlude(
        &self,
        model: &dyn ProbabilisticModel,
        x: &[f64],
    ) -> Result<Vec<f64>, ExplainError> {
        let width = model.input_width();
        if x.len() != width {
            return Err(ExplainError::RowWidth {
                expected: width,
                got: x.len(),
            });
        }
        let zeros;
        let baseline: &[f64] = match &self.baseline {
            Some(b) if b.len() != width => {
                return Err(ExplainError::BaselineWidth {
                    expected: width,
                    got: b.len(),
                })
            }
            Some(b) => b,
            None => {
                zeros = vec![0.0; width];
                &zeros
            }
        };

        let full = log_odds(model.positive_probability(x)?)?;
        let mut probe = x.to_vec();
        let mut contributions = vec![0.0; width];

        for i in 0..width {
            if x[i] == baseline[i] {
                continue;
            }
            probe[i] = baseline[i];
            let without = log_odds(model.positive_probability(&probe)?)?;
            probe[i] = x[i];
            contributions[i] = full - without;
        }

        Ok(contributions)
    }
}

impl AttributionStrategy for OcclusionAttribution {
    fn name(&self) -> &'static str {
        "occlusion"
    }

    fn attribute(
        &self,
        model: &dyn ProbabilisticModel,
        x: &[f64],
    ) -> Result<Vec<f64>, ExplainError> {
        self.occlude(model, x)
    }
}

/// `coef_i * x_i` for linear models.
///
/// An approximation of each column's marginal effect on the log-odds
/// relative to an all-zero input; it is not a causal attribution and has
/// no meaning for non-linear models.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoefficientProduct;

impl AttributionStrategy for CoefficientProduct {
    fn name(&self) -> &'static str {
        "coefficient_product"
    }

    fn attribute(
        &self,
        model: &dyn ProbabilisticModel,
        x: &[f64],
    ) -> Result<Vec<f64>, ExplainError> {
        let coefficients = model.linear_coefficients().ok_or(ExplainError::NotLinear)?;
        if coefficients.len() != x.len() {
            return Err(ExplainError::RowWidth {
                expected: coefficients.len(),
                got: x.len(),
            });
        }
        Ok(coefficients.iter().zip(x).map(|(w, v)| w * v).collect())
    }
}
