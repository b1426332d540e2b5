use super::schema::{FeatureSchema, HEURISTIC_COLUMNS, HEURISTIC_COLUMN_COUNT};
use super::vectorizer::{LexicalVector, TfidfVectorizer};
use crate::error::{DetectorError, Result};
use crate::features::model_heuristics;

/// One classifier input: lexical columns first, then the heuristic columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub lexical: LexicalVector,
    pub lexical_width: usize,
    pub heuristics: [f64; HEURISTIC_COLUMN_COUNT],
}

impl FeatureRow {
    pub fn width(&self) -> usize {
        self.lexical_width + HEURISTIC_COLUMN_COUNT
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.width()];
        for (i, v) in self.lexical.iter() {
            dense[i] = v;
        }
        dense[self.lexical_width..].copy_from_slice(&self.heuristics);
        dense
    }
}

/// Build the feature row for `url`.
///
/// Both the trainer and the detector go through this function, so the
/// column layout cannot drift between them.
pub fn compose(
    schema: &FeatureSchema,
    vectorizer: &TfidfVectorizer,
    url: &str,
) -> Result<FeatureRow> {
    if vectorizer.vocabulary_size() != schema.lexical_width {
        return Err(DetectorError::SchemaMismatch {
            expected: schema.width(),
            got: vectorizer.vocabulary_size() + HEURISTIC_COLUMN_COUNT,
        });
    }

    let lexical = vectorizer.transform(url);
    if let Some(&max) = lexical.indices.last() {
        if max >= schema.lexical_width {
            return Err(DetectorError::SchemaMismatch {
                expected: schema.width(),
                got: max + 1 + HEURISTIC_COLUMN_COUNT,
            });
        }
    }

    let row = FeatureRow {
        lexical,
        lexical_width: vectorizer.vocabulary_size(),
        heuristics: model_heuristics(url),
    };
    schema.check_width(row.width())?;
    Ok(row)
}

pub fn compose_batch<S: AsRef<str>>(
    schema: &FeatureSchema,
    vectorizer: &TfidfVectorizer,
    urls: &[S],
) -> Result<Vec<FeatureRow>> {
    urls.iter()
        .map(|url| compose(schema, vectorizer, url.as_ref()))
        .collect()
}

/// Names for every column of a composed row, in column order.
pub fn feature_names(schema: &FeatureSchema, vectorizer: &TfidfVectorizer) -> Vec<String> {
    let mut names: Vec<String> = if vectorizer.vocabulary_size() == schema.lexical_width {
        vectorizer.feature_names().to_vec()
    } else {
        (0..schema.lexical_width)
            .map(|i| format!("text_ngram_{}", i))
            .collect()
    };
    names.extend(HEURISTIC_COLUMNS.iter().map(|s| s.to_string()));
    names
}
