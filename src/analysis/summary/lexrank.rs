use std::collections::{HashMap, HashSet};

use super::sentences::sentence_words;
use super::{RankedSentence, SentenceRanker};
use crate::analysis::error::{AnalysisError, EngineResult, Stage};

pub const DEFAULT_THRESHOLD: f64 = 0.1;
pub const DEFAULT_EPSILON: f64 = 0.1;
const MAX_POWER_ITERATIONS: usize = 10_000;

/// Eigenvector centrality over a thresholded sentence-similarity graph.
///
/// Two sentences are linked when their idf-modified cosine exceeds `threshold`.
/// The adjacency matrix is degree-normalized and scored with the power method,
/// stopping once successive vectors differ by less than `epsilon`.
#[derive(Debug, Clone)]
pub struct LexRank {
    threshold: f64,
    epsilon: f64,
}

impl LexRank {
    pub fn new(threshold: f64, epsilon: f64) -> Self {
        Self { threshold, epsilon }
    }

    /// Centrality score per sentence, in input order.
    pub fn scores(&self, sentences: &[&str]) -> EngineResult<Vec<f64>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let words: Vec<Vec<String>> = sentences.iter().map(|s| sentence_words(s)).collect();
        let tf: Vec<HashMap<&str, f64>> = words.iter().map(|w| term_frequencies(w)).collect();
        let idf = inverse_document_frequencies(&words);
        let matrix = self.adjacency(&tf, &idf);
        power_method(&matrix, self.epsilon)
    }

    fn adjacency(&self, tf: &[HashMap<&str, f64>], idf: &HashMap<&str, f64>) -> Vec<Vec<f64>> {
        let n = tf.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for row in 0..n {
            let mut degree = 0.0;
            for col in 0..n {
                if idf_modified_cosine(&tf[row], &tf[col], idf) > self.threshold {
                    matrix[row][col] = 1.0;
                    degree += 1.0;
                }
            }
            if degree > 0.0 {
                for cell in &mut matrix[row] {
                    *cell /= degree;
                }
            }
        }
        matrix
    }
}

impl Default for LexRank {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_EPSILON)
    }
}

impl SentenceRanker for LexRank {
    /// Keeps the `count` best-scored sentences (earlier sentence on ties),
    /// returned in document order.
    fn rank(&self, sentences: &[&str], count: usize) -> EngineResult<Vec<RankedSentence>> {
        let scores = self.scores(sentences)?;
        let mut ranked: Vec<RankedSentence> = scores
            .into_iter()
            .enumerate()
            .map(|(index, score)| RankedSentence { index, score })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(count);
        ranked.sort_by_key(|r| r.index);
        Ok(ranked)
    }
}

/// Term counts scaled by the sentence's most frequent term.
fn term_frequencies(words: &[String]) -> HashMap<&str, f64> {
    let mut counts: HashMap<&str, f64> = HashMap::new();
    for word in words {
        *counts.entry(word.as_str()).or_insert(0.0) += 1.0;
    }
    let max = counts.values().copied().fold(0.0, f64::max);
    if max > 0.0 {
        for value in counts.values_mut() {
            *value /= max;
        }
    }
    counts
}

/// `ln(N / (1 + df))` per term.
fn inverse_document_frequencies(words: &[Vec<String>]) -> HashMap<&str, f64> {
    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for sentence in words {
        let distinct: HashSet<&str> = sentence.iter().map(String::as_str).collect();
        for term in distinct {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }
    let n = words.len() as f64;
    doc_freq
        .into_iter()
        .map(|(term, df)| (term, (n / (1.0 + df as f64)).ln()))
        .collect()
}

fn idf_modified_cosine(
    a: &HashMap<&str, f64>,
    b: &HashMap<&str, f64>,
    idf: &HashMap<&str, f64>,
) -> f64 {
    let weight = |term: &str| idf.get(term).copied().unwrap_or(0.0);

    let numerator: f64 = a
        .iter()
        .filter_map(|(term, tf_a)| b.get(term).map(|tf_b| tf_a * tf_b * weight(term).powi(2)))
        .sum();
    let norm = |tf: &HashMap<&str, f64>| {
        tf.iter()
            .map(|(term, value)| (value * weight(term)).powi(2))
            .sum::<f64>()
            .sqrt()
    };
    let (norm_a, norm_b) = (norm(a), norm(b));

    if norm_a > 0.0 && norm_b > 0.0 {
        numerator / (norm_a * norm_b)
    } else {
        0.0
    }
}

fn power_method(matrix: &[Vec<f64>], epsilon: f64) -> EngineResult<Vec<f64>> {
    let n = matrix.len();
    let mut p = vec![1.0 / n as f64; n];

    for _ in 0..MAX_POWER_ITERATIONS {
        // next = Mᵀ p
        let mut next = vec![0.0; n];
        for (row, weights) in matrix.iter().enumerate() {
            for (col, weight) in weights.iter().enumerate() {
                next[col] += weight * p[row];
            }
        }
        let delta = next
            .iter()
            .zip(&p)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        p = next;
        if delta <= epsilon {
            return Ok(p);
        }
    }

    Err(AnalysisError::computation(
        Stage::SentenceRanking,
        format!("power iteration did not converge within {MAX_POWER_ITERATIONS} steps"),
    ))
}
