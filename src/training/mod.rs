//! Offline fitting of the (vectorizer, classifier) pair.
//!
//! Rows are built with the same `compose` call the detector uses, so the
//! persisted pair always honours the inference column layout.

use crate::config::TrainingConfig;
use crate::detector::Detector;
use crate::error::{DetectorError, Result};
use crate::model::{
    classifier::sigmoid, compose_batch, ArtifactStore, Artifacts, FeatureRow, FeatureSchema,
    LogisticModel, TfidfVectorizer, HEURISTIC_COLUMN_COUNT,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifacts: Artifacts,
    pub report: TrainingReport,
}

#[derive(Debug, Deserialize)]
struct LabeledRow {
    url: String,
    label: u8,
}

/// Read `(url, label)` pairs from a CSV file with a `url,label` header.
pub fn load_labeled_csv<P: AsRef<Path>>(path: P) -> Result<Vec<(String, u8)>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut samples = Vec::new();
    for (line, record) in reader.deserialize::<LabeledRow>().enumerate() {
        let row = record?;
        if row.label > 1 {
            return Err(DetectorError::TrainingData(format!(
                "row {}: label {} is not 0 or 1",
                line + 1,
                row.label
            )));
        }
        samples.push((row.url, row.label));
    }
    log::info!(
        "Loaded {} labeled URLs from {}",
        samples.len(),
        path.as_ref().display()
    );
    Ok(samples)
}

/// Per-column centre and scale for the heuristic block.
///
/// The optimiser works on standardized heuristics; the fitted weights are
/// mapped back so the saved model takes raw rows.
struct HeuristicScaling {
    mean: [f64; HEURISTIC_COLUMN_COUNT],
    scale: [f64; HEURISTIC_COLUMN_COUNT],
}

impl HeuristicScaling {
    fn fit(rows: &[&FeatureRow]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = [0.0; HEURISTIC_COLUMN_COUNT];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.heuristics.iter()) {
                *m += v / n;
            }
        }
        let mut scale = [0.0; HEURISTIC_COLUMN_COUNT];
        for row in rows {
            for j in 0..HEURISTIC_COLUMN_COUNT {
                scale[j] += (row.heuristics[j] - mean[j]).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }
        Self { mean, scale }
    }

    fn apply(&self, row: &FeatureRow) -> [f64; HEURISTIC_COLUMN_COUNT] {
        let mut out = [0.0; HEURISTIC_COLUMN_COUNT];
        for j in 0..HEURISTIC_COLUMN_COUNT {
            out[j] = (row.heuristics[j] - self.mean[j]) / self.scale[j];
        }
        out
    }
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn fit(&self, samples: &[(String, u8)]) -> Result<TrainingOutcome> {
        check_samples(samples)?;

        let urls: Vec<&str> = samples.iter().map(|(url, _)| url.as_str()).collect();
        let vectorizer = TfidfVectorizer::fit(&urls, self.config.vectorizer_params())
            .map_err(DetectorError::TrainingData)?;
        let schema = FeatureSchema::new(vectorizer.vocabulary_size());
        let rows = compose_batch(&schema, &vectorizer, &urls)?;

        let (train_idx, test_idx) = self.split(samples.len());
        let train_rows: Vec<&FeatureRow> = train_idx.iter().map(|&i| &rows[i]).collect();
        let train_labels: Vec<u8> = train_idx.iter().map(|&i| samples[i].1).collect();
        if !train_labels.contains(&0) || !train_labels.contains(&1) {
            return Err(DetectorError::TrainingData(
                "training split contains a single class".to_string(),
            ));
        }

        log::info!(
            "Training on {} URLs ({} held out), {} lexical columns",
            train_idx.len(),
            test_idx.len(),
            schema.lexical_width
        );

        let classifier = self.fit_logistic(schema, &train_rows, &train_labels);
        let artifacts = Artifacts::new(classifier, vectorizer)?;

        let model = artifacts.classifier();
        let predictions = test_idx
            .iter()
            .map(|&i| -> Result<(u8, u8)> {
                let p = model.predict_proba(&rows[i])?;
                Ok((samples[i].1, model.predict_label(p)))
            })
            .collect::<Result<Vec<(u8, u8)>>>()?;
        let report = evaluate(train_idx.len(), &predictions);
        log::info!(
            "Held-out accuracy {:.4}, precision {:.4}, recall {:.4}, f1 {:.4}",
            report.accuracy,
            report.precision,
            report.recall,
            report.f1
        );

        Ok(TrainingOutcome { artifacts, report })
    }

    /// Seeded shuffle, then the first `test_fraction` (rounded up) is held out.
    fn split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        let test_size = ((n as f64) * self.config.test_fraction).ceil() as usize;
        let test_size = test_size.clamp(1, n.saturating_sub(1).max(1));
        let train = indices.split_off(test_size);
        (train, indices)
    }

    /// L2-regularized logistic regression with balanced class weights, by
    /// full-batch gradient descent on `C·Σ sᵢ·lossᵢ + ½‖w‖²` scaled by `1/(C·n)`.
    fn fit_logistic(&self, schema: FeatureSchema, rows: &[&FeatureRow], labels: &[u8]) -> LogisticModel {
        let n = rows.len();
        let lexical_width = schema.lexical_width;
        let width = schema.width();

        let positives = labels.iter().filter(|&&y| y == 1).count();
        let class_weight = |y: u8| {
            let count = if y == 1 { positives } else { n - positives };
            n as f64 / (2.0 * count as f64)
        };
        let weights: Vec<f64> = labels.iter().map(|&y| class_weight(y)).collect();

        let scaling = HeuristicScaling::fit(rows);
        let scaled: Vec<[f64; HEURISTIC_COLUMN_COUNT]> =
            rows.iter().map(|row| scaling.apply(row)).collect();

        let mut w = vec![0.0; width];
        let mut b = 0.0;
        let mut grad = vec![0.0; width];
        let penalty = 1.0 / (self.config.l2_c * n as f64);
        let lr = self.config.learning_rate;

        let mut iterations = 0;
        for iter in 0..self.config.max_iter {
            iterations = iter + 1;
            grad.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;

            for (k, row) in rows.iter().enumerate() {
                let mut z = b;
                for (i, v) in row.lexical.iter() {
                    z += w[i] * v;
                }
                for (j, v) in scaled[k].iter().enumerate() {
                    z += w[lexical_width + j] * v;
                }
                let residual = weights[k] * (sigmoid(z) - labels[k] as f64) / n as f64;

                for (i, v) in row.lexical.iter() {
                    grad[i] += residual * v;
                }
                for (j, v) in scaled[k].iter().enumerate() {
                    grad[lexical_width + j] += residual * v;
                }
                grad_b += residual;
            }

            let mut max_step: f64 = grad_b.abs();
            for (g, wi) in grad.iter_mut().zip(w.iter()) {
                *g += penalty * wi;
                max_step = max_step.max(g.abs());
            }
            if max_step < TOLERANCE {
                break;
            }

            for (wi, g) in w.iter_mut().zip(grad.iter()) {
                *wi -= lr * g;
            }
            b -= lr * grad_b;
        }
        log::debug!("Logistic fit stopped after {} iterations", iterations);

        // back to raw heuristic units
        for j in 0..HEURISTIC_COLUMN_COUNT {
            let col = lexical_width + j;
            w[col] /= scaling.scale[j];
            b -= w[col] * scaling.mean[j];
        }

        let mut means = vec![0.0; width];
        for row in rows {
            for (i, v) in row.lexical.iter() {
                means[i] += v / n as f64;
            }
        }
        means[lexical_width..].copy_from_slice(&scaling.mean);

        LogisticModel {
            model_id: format!("url_lr_{}", uuid::Uuid::new_v4().simple()),
            schema,
            coefficients: w,
            intercept: b,
            threshold: 0.5,
            feature_means: Some(means),
        }
    }
}

fn check_samples(samples: &[(String, u8)]) -> Result<()> {
    if samples.is_empty() {
        return Err(DetectorError::TrainingData("no labeled samples".to_string()));
    }
    if let Some((url, label)) = samples.iter().find(|(_, label)| *label > 1) {
        return Err(DetectorError::TrainingData(format!(
            "label {} for {} is not 0 or 1",
            label, url
        )));
    }
    let positives = samples.iter().filter(|(_, label)| *label == 1).count();
    if positives == 0 || positives == samples.len() {
        return Err(DetectorError::TrainingData(
            "both phishing and benign samples are required".to_string(),
        ));
    }
    Ok(())
}

/// Metrics over `(actual, predicted)` pairs, positive class = phishing.
fn evaluate(train_size: usize, pairs: &[(u8, u8)]) -> TrainingReport {
    let count = |actual: u8, predicted: u8| {
        pairs
            .iter()
            .filter(|&&(a, p)| a == actual && p == predicted)
            .count() as f64
    };
    let tp = count(1, 1);
    let tn = count(0, 0);
    let fp = count(0, 1);
    let fn_ = count(1, 0);

    let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);

    TrainingReport {
        train_size,
        test_size: pairs.len(),
        accuracy: ratio(tp + tn, pairs.len() as f64),
        precision,
        recall,
        f1: ratio(2.0 * precision * recall, precision + recall),
    }
}

/// Train, persist through `store`, and confirm the saved pair loads back.
pub fn retrain_and_check(
    store: &dyn ArtifactStore,
    trainer: &Trainer,
    samples: &[(String, u8)],
) -> Result<TrainingReport> {
    let outcome = trainer.fit(samples)?;
    store.save(&outcome.artifacts)?;

    let reloaded = Detector::load(store)?;
    let probe = &samples[0].0;
    let before = Detector::from_artifacts(outcome.artifacts).predict_url(probe)?;
    let after = reloaded.predict_url(probe)?;
    if (before.phishing_prob - after.phishing_prob).abs() > 1e-9 {
        return Err(DetectorError::ArtifactCorrupt {
            path: std::path::PathBuf::from(crate::model::artifacts::MODEL_FILE),
            reason: format!(
                "reloaded model scores {} as {:.6}, trained model as {:.6}",
                probe, after.phishing_prob, before.phishing_prob
            ),
        });
    }
    log::info!(
        "Reloaded model '{}' after retraining",
        reloaded.artifacts().classifier().model_id
    );
    log::info!("Drift check skipped: no reference distribution is kept");

    Ok(outcome.report)
}
