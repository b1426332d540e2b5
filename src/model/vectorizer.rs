use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sparse lexical features of one document, sorted by column index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexicalVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl LexicalVector {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerParams {
    pub ngram_min: usize,
    pub ngram_max: usize,
    pub max_features: usize,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            ngram_min: 3,
            ngram_max: 5,
            max_features: 2000,
        }
    }
}

/// Character n-gram TF-IDF over word-bounded windows.
///
/// Each whitespace-separated word is padded with one space on either side
/// before n-grams are taken, so n-grams never span words. Input is
/// lower-cased. Weights are raw counts times smoothed idf
/// (`ln((1 + n) / (1 + df)) + 1`), then l2-normalised.
///
/// The vocabulary is frozen once fitted; unseen n-grams are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "VectorizerFile", into = "VectorizerFile")]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct VectorizerFile {
    params: VectorizerParams,
    vocabulary: Vec<String>,
    idf: Vec<f64>,
}

impl TryFrom<VectorizerFile> for TfidfVectorizer {
    type Error = String;

    fn try_from(file: VectorizerFile) -> Result<Self, Self::Error> {
        TfidfVectorizer::from_parts(file.params, file.vocabulary, file.idf)
    }
}

impl From<TfidfVectorizer> for VectorizerFile {
    fn from(vectorizer: TfidfVectorizer) -> Self {
        Self {
            params: vectorizer.params,
            vocabulary: vectorizer.vocabulary,
            idf: vectorizer.idf,
        }
    }
}

/// Word-bounded character n-grams of `text`.
pub fn char_wb_ngrams(text: &str, ngram_min: usize, ngram_max: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut ngrams = Vec::new();

    for word in lowered.split_whitespace() {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        let len = padded.len();

        for n in ngram_min..=ngram_max {
            let mut offset = 0;
            ngrams.push(padded[offset..(offset + n).min(len)].iter().collect());
            while offset + n < len {
                offset += 1;
                ngrams.push(padded[offset..offset + n].iter().collect());
            }
            // a word shorter than n is emitted once, whole
            if offset == 0 {
                break;
            }
        }
    }

    ngrams
}

impl TfidfVectorizer {
    pub fn from_parts(
        params: VectorizerParams,
        vocabulary: Vec<String>,
        idf: Vec<f64>,
    ) -> Result<Self, String> {
        if params.ngram_min == 0 || params.ngram_min > params.ngram_max {
            return Err(format!(
                "invalid n-gram range {}..={}",
                params.ngram_min, params.ngram_max
            ));
        }
        if vocabulary.len() != idf.len() {
            return Err(format!(
                "vocabulary has {} terms but idf has {} weights",
                vocabulary.len(),
                idf.len()
            ));
        }
        if let Some(pos) = idf.iter().position(|w| !w.is_finite()) {
            return Err(format!("non-finite idf weight at index {}", pos));
        }

        let mut index = HashMap::with_capacity(vocabulary.len());
        for (i, term) in vocabulary.iter().enumerate() {
            if index.insert(term.clone(), i).is_some() {
                return Err(format!("duplicate vocabulary term {:?}", term));
            }
        }

        Ok(Self {
            params,
            vocabulary,
            idf,
            index,
        })
    }

    /// Learn vocabulary and idf weights from a corpus.
    ///
    /// When the corpus has more distinct n-grams than `max_features`, the
    /// most frequent ones (by total count, ties by term) are kept. Column
    /// indices follow the alphabetical order of the kept terms.
    pub fn fit<S: AsRef<str>>(documents: &[S], params: VectorizerParams) -> Result<Self, String> {
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let mut seen: HashMap<String, usize> = HashMap::new();
            for gram in char_wb_ngrams(doc.as_ref(), params.ngram_min, params.ngram_max) {
                *seen.entry(gram).or_insert(0) += 1;
            }
            for (gram, count) in seen {
                *term_counts.entry(gram.clone()).or_insert(0) += count;
                *doc_freq.entry(gram).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = term_counts.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(params.max_features);

        let mut vocabulary: Vec<String> = terms.into_iter().map(|(term, _)| term).collect();
        vocabulary.sort();

        let n_docs = documents.len() as f64;
        let idf = vocabulary
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        log::debug!(
            "Fitted vectorizer: {} documents, {} terms",
            documents.len(),
            vocabulary.len()
        );

        Self::from_parts(params, vocabulary, idf)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Column names in index order.
    pub fn feature_names(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn transform(&self, text: &str) -> LexicalVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for gram in char_wb_ngrams(text, self.params.ngram_min, self.params.ngram_max) {
            if let Some(&i) = self.index.get(&gram) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(i, count)| (i, count * self.idf[i]))
            .collect();
        entries.sort_by_key(|(i, _)| *i);

        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for entry in entries.iter_mut() {
                entry.1 /= norm;
            }
        }

        let (indices, values) = entries.into_iter().unzip();
        LexicalVector { indices, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min: usize, max: usize, max_features: usize) -> VectorizerParams {
        VectorizerParams {
            ngram_min: min,
            ngram_max: max,
            max_features,
        }
    }

    #[test]
    fn test_char_wb_ngrams_pad_words() {
        let grams = char_wb_ngrams("Ab", 3, 3);
        assert_eq!(grams, vec![" ab", "ab "]);

        let grams = char_wb_ngrams("a b", 2, 2);
        assert_eq!(grams, vec![" a", "a ", " b", "b "]);
    }

    #[test]
    fn test_short_word_emitted_once() {
        // " a " is shorter than 5; emitted whole and no longer n is tried
        let grams = char_wb_ngrams("a", 3, 5);
        assert_eq!(grams, vec![" a "]);
    }

    #[test]
    fn test_fit_limits_and_orders_vocabulary() {
        let docs = ["aaaa", "aaaa", "abcd"];
        let vec = TfidfVectorizer::fit(&docs, params(3, 3, 3)).unwrap();

        assert_eq!(vec.vocabulary_size(), 3);
        let names = vec.feature_names();
        let mut sorted = names.to_vec();
        sorted.sort();
        assert_eq!(names, sorted.as_slice());
        assert!(names.contains(&"aaa".to_string()));
    }

    #[test]
    fn test_transform_is_l2_normalised() {
        let docs = ["http://example.com/login", "https://paypal.verify.info"];
        let vec = TfidfVectorizer::fit(&docs, params(3, 5, 2000)).unwrap();

        let row = vec.transform(docs[0]);
        let norm: f64 = row.values.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(row.indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unseen_text_is_empty_row() {
        let vec = TfidfVectorizer::fit(&["abcdef"], params(3, 3, 100)).unwrap();
        let row = vec.transform("zzzz");
        assert_eq!(row.nnz(), 0);
    }

    #[test]
    fn test_serialization_rebuilds_index() {
        let vec = TfidfVectorizer::fit(&["login-verify", "account"], params(3, 4, 100)).unwrap();
        let json = serde_json::to_string(&vec).unwrap();
        let restored: TfidfVectorizer = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.feature_names(), vec.feature_names());
        assert_eq!(restored.transform("login"), vec.transform("login"));
    }

    #[test]
    fn test_mismatched_parts_rejected() {
        let err = TfidfVectorizer::from_parts(params(3, 5, 10), vec!["abc".to_string()], vec![]);
        assert!(err.is_err());

        let err = TfidfVectorizer::from_parts(params(4, 3, 10), vec![], vec![]);
        assert!(err.is_err());
    }
}
