//! Ranked feature contributions for a scored row.
//!
//! The primary strategy is tried first; if it fails for any reason the
//! coefficient-product fallback is computed in full instead. Callers get
//! either one complete ranking or a schema error, never a partial result.

pub mod strategies;

pub use strategies::{AttributionStrategy, CoefficientProduct, ExplainError, OcclusionAttribution};

use crate::error::{DetectorError, Result};
use crate::model::{LogisticModel, ProbabilisticModel};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub feature: String,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    pub top_positive: Vec<Contribution>,
    pub top_negative: Vec<Contribution>,
    /// Strategy that produced the values.
    pub method: String,
}

pub struct Explainer {
    primary: Option<Box<dyn AttributionStrategy>>,
    fallback: CoefficientProduct,
    top_n: usize,
}

impl Explainer {
    pub fn new(primary: Box<dyn AttributionStrategy>, top_n: usize) -> Self {
        Self {
            primary: Some(primary),
            fallback: CoefficientProduct,
            top_n,
        }
    }

    /// Occlusion against the model's training means, when it has them.
    pub fn for_model(model: &LogisticModel, top_n: usize) -> Self {
        let primary = match &model.feature_means {
            Some(means) => OcclusionAttribution::with_baseline(means.clone()),
            None => OcclusionAttribution::default(),
        };
        Self::new(Box::new(primary), top_n)
    }

    pub fn fallback_only(top_n: usize) -> Self {
        Self {
            primary: None,
            fallback: CoefficientProduct,
            top_n,
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    fn attribute(
        &self,
        model: &dyn ProbabilisticModel,
        x: &[f64],
    ) -> Result<(Vec<f64>, &'static str)> {
        if let Some(primary) = &self.primary {
            match primary.attribute(model, x) {
                Ok(values) if values.len() == x.len() => return Ok((values, primary.name())),
                Ok(values) => log::debug!(
                    "{} returned {} values for {} columns, using {}",
                    primary.name(),
                    values.len(),
                    x.len(),
                    self.fallback.name()
                ),
                Err(e) => log::debug!(
                    "{} failed ({}), using {}",
                    primary.name(),
                    e,
                    self.fallback.name()
                ),
            }
        }

        self.fallback
            .attribute(model, x)
            .map(|values| (values, self.fallback.name()))
            .map_err(|e| match e {
                ExplainError::RowWidth { expected, got } => {
                    DetectorError::SchemaMismatch { expected, got }
                }
                ExplainError::Model(inner) => inner,
                other => DetectorError::Explanation(other.to_string()),
            })
    }

    /// Rank the contributions of dense row `x`; `names` labels its columns.
    pub fn explain(
        &self,
        model: &dyn ProbabilisticModel,
        names: &[String],
        x: &[f64],
    ) -> Result<Ranking> {
        if names.len() != x.len() {
            return Err(DetectorError::SchemaMismatch {
                expected: x.len(),
                got: names.len(),
            });
        }
        let (values, method) = self.attribute(model, x)?;
        let (top_positive, top_negative) = rank(names, &values, self.top_n);
        Ok(Ranking {
            top_positive,
            top_negative,
            method: method.to_string(),
        })
    }
}

/// Highest and lowest `top_n` contributions.
///
/// Both orders are stable, so equal contributions stay in column order.
pub fn rank(
    names: &[String],
    values: &[f64],
    top_n: usize,
) -> (Vec<Contribution>, Vec<Contribution>) {
    let mut order: Vec<usize> = (0..values.len().min(names.len())).collect();
    let pick = |order: &[usize]| -> Vec<Contribution> {
        order
            .iter()
            .take(top_n)
            .map(|&i| Contribution {
                feature: names[i].clone(),
                contribution: values[i],
            })
            .collect()
    };

    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));
    let positive = pick(&order);

    order.sort_by_key(|&i| i);
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    let negative = pick(&order);

    (positive, negative)
}
