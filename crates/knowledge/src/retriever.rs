//! TF-IDF relevance ranking over a fixed chunk corpus.
//!
//! Weights follow the usual smoothed formulation: `idf(t) = ln((1 + n) /
//! (1 + df(t))) + 1`, raw term counts times idf, then L2 normalisation per
//! vector. Similarity is the cosine, which for unit vectors is the dot
//! product.

use crate::types::DocumentChunk;
use std::collections::HashMap;

/// Sparse vector as `(term index, weight)` pairs.
type SparseVector = Vec<(usize, f64)>;

/// Ranks chunks against free-text queries.
///
/// The index is built once and never changes, so a retriever can be shared
/// across concurrent callers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TfidfRetriever {
    chunks: Vec<DocumentChunk>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<SparseVector>,
    default_k: usize,
}

impl TfidfRetriever {
    /// Fit the vocabulary and weights over `chunks`.
    pub fn new(chunks: Vec<DocumentChunk>, default_k: usize) -> Self {
        let tokenized: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.content)).collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen: Vec<usize> = Vec::new();
            for token in tokens {
                let next = vocabulary.len();
                let index = *vocabulary.entry(token.clone()).or_insert(next);
                if index == document_frequency.len() {
                    document_frequency.push(0);
                }
                if !seen.contains(&index) {
                    seen.push(index);
                    document_frequency[index] += 1;
                }
            }
        }

        let n = chunks.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|df| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        let vectors = tokenized
            .iter()
            .map(|tokens| weigh(tokens, &vocabulary, &idf))
            .collect();

        tracing::debug!(
            "Built TF-IDF index: {} chunks, {} terms",
            chunks.len(),
            vocabulary.len()
        );

        Self {
            chunks,
            vocabulary,
            idf,
            vectors,
            default_k,
        }
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// `None` or `Some(0)` uses the default `k`. Chunks with equal scores keep
    /// their corpus order. Returned copies carry the score rounded to four
    /// decimals.
    pub fn query(&self, query: &str, k: Option<usize>) -> Vec<DocumentChunk> {
        let k = match k {
            Some(k) if k > 0 => k,
            _ => self.default_k,
        };

        let query_vector: HashMap<usize, f64> =
            weigh(&tokenize(query), &self.vocabulary, &self.idf)
                .into_iter()
                .collect();

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, dot(vector, &query_vector)))
            .collect();

        // sort_by is stable, so ties stay in corpus order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(k)
            .map(|(index, score)| {
                let mut chunk = self.chunks[index].clone();
                chunk.score = Some(round_to(score, 4));
                chunk
            })
            .collect()
    }

    /// All indexed chunks in corpus order.
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Lowercased runs of two or more word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Count known terms, scale by idf and normalise. Unknown terms are dropped.
fn weigh(tokens: &[String], vocabulary: &HashMap<String, usize>, idf: &[f64]) -> SparseVector {
    let mut counts: HashMap<usize, f64> = HashMap::new();
    for token in tokens {
        if let Some(index) = vocabulary.get(token) {
            *counts.entry(*index).or_insert(0.0) += 1.0;
        }
    }

    let mut vector: SparseVector = counts
        .into_iter()
        .map(|(index, count)| (index, count * idf[index]))
        .collect();
    vector.sort_by_key(|(index, _)| *index);

    let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, weight) in &mut vector {
            *weight /= norm;
        }
    }

    vector
}

fn dot(vector: &SparseVector, other: &HashMap<usize, f64>) -> f64 {
    vector
        .iter()
        .filter_map(|(index, weight)| other.get(index).map(|w| w * weight))
        .sum()
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_matches_word_runs() {
        assert_eq!(
            tokenize("AOV = Revenue / #Orders; a_b x 1997-06"),
            vec!["aov", "revenue", "orders", "a_b", "1997", "06"]
        );
    }

    #[test]
    fn test_tokenize_keeps_unicode_letters() {
        assert_eq!(tokenize("Café Über"), vec!["café", "über"]);
    }

    #[test]
    fn test_weigh_is_unit_length() {
        let mut vocabulary = HashMap::new();
        vocabulary.insert("alpha".to_string(), 0);
        vocabulary.insert("beta".to_string(), 1);
        let idf = vec![1.0, 2.0];

        let tokens: Vec<String> = ["alpha", "beta", "beta", "gamma"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vector = weigh(&tokens, &vocabulary, &idf);

        assert_eq!(vector.len(), 2);
        let norm: f64 = vector.iter().map(|(_, w)| w * w).sum();
        assert!((norm - 1.0).abs() < 1e-12);
        // beta weighs 2 * 2.0 against alpha's 1 * 1.0
        assert!((vector[1].1 / vector[0].1 - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(0.83333, 3), 0.833);
    }
}
