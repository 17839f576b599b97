use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Tokens are runs of two or more word characters.
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Sparse row: feature indices ascending, values aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn squared_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&i, &v)| v * dense[i])
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// Fitted document-term matrix.
#[derive(Debug, Clone)]
pub struct TermMatrix {
    pub terms: Vec<String>,
    pub rows: Vec<SparseVector>,
}

impl TermMatrix {
    pub fn n_features(&self) -> usize {
        self.terms.len()
    }
}

/// TF-IDF over unigrams and bigrams, fitted per batch.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    max_features: usize,
    ngram_range: (usize, usize),
}

impl TfIdfVectorizer {
    pub fn new() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            ngram_range: (1, 2),
        }
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.ngram_range = (min_n.max(1), max_n.max(min_n.max(1)));
        self
    }

    fn analyze(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_REGEX.find_iter(&lowered).map(|m| m.as_str()).collect();

        let (min_n, max_n) = self.ngram_range;
        let mut grams = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                grams.push(window.join(" "));
            }
        }
        grams
    }

    /// Learns the vocabulary and idf weights from `documents` and returns their L2-normalized rows.
    ///
    /// The vocabulary keeps the `max_features` terms with the highest total count
    /// (ties broken alphabetically); features are indexed alphabetically.
    pub fn fit_transform<S: AsRef<str>>(&self, documents: &[S]) -> TermMatrix {
        let analyzed: Vec<Vec<String>> = documents.iter().map(|d| self.analyze(d.as_ref())).collect();

        let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
        for grams in &analyzed {
            for gram in grams {
                *corpus_counts.entry(gram.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term.to_string()).collect();
        terms.sort();
        let vocabulary: HashMap<&str, usize> = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.as_str(), idx))
            .collect();

        let counts: Vec<BTreeMap<usize, f64>> = analyzed
            .iter()
            .map(|grams| {
                let mut row = BTreeMap::new();
                for gram in grams {
                    if let Some(&idx) = vocabulary.get(gram.as_str()) {
                        *row.entry(idx).or_insert(0.0) += 1.0;
                    }
                }
                row
            })
            .collect();

        let mut doc_freq = vec![0usize; terms.len()];
        for row in &counts {
            let seen: HashSet<usize> = row.keys().copied().collect();
            for idx in seen {
                doc_freq[idx] += 1;
            }
        }

        let n_docs = documents.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let rows = counts
            .into_iter()
            .map(|row| {
                let mut vector = SparseVector::default();
                for (idx, tf) in row {
                    vector.indices.push(idx);
                    vector.values.push(tf * idf[idx]);
                }
                let norm = vector.squared_norm().sqrt();
                if norm > 0.0 {
                    for value in &mut vector.values {
                        *value /= norm;
                    }
                }
                vector
            })
            .collect();

        TermMatrix { terms, rows }
    }
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}
