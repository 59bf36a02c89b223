//! TF-IDF vector index over a bot's normalized scripts.
//!
//! Features are unigrams and bigrams of two-or-more character tokens with
//! English stop-words removed. The vocabulary is capped to the most frequent
//! terms of the corpus, ties going to the term seen first. Rows are stored
//! sparse and L2-normalized, one per document, in input order.

use std::collections::HashMap;

use crate::trainer::error::TrainerError;
use crate::trainer::normalize::tokenize;
use crate::trainer::stopwords::is_stop_word;

/// Default vocabulary cap.
pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Sparse vector of `(column, weight)` pairs sorted by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Weight raw term counts by IDF and scale to unit length.
    fn weighted(counts: HashMap<usize, usize>, idf: &[f64]) -> Self {
        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, count)| (col, count as f64 * idf[col]))
            .collect();
        entries.sort_unstable_by_key(|&(col, _)| col);

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_col, a_w) = self.entries[i];
            let (b_col, b_w) = other.entries[j];
            match a_col.cmp(&b_col) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Cosine similarity. A zero vector on either side scores 0.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    a.dot(b) / denom
}

/// A fitted vocabulary, its IDF weights, and the document matrix.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    rows: Vec<SparseVector>,
}

impl VectorIndex {
    /// Fit the index over already-normalized documents.
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Result<Self, TrainerError> {
        if documents.is_empty() {
            return Err(TrainerError::EmptyCorpus);
        }

        let analyzed: Vec<Vec<String>> = documents.iter().map(|d| analyze(d.as_ref())).collect();

        // Corpus-wide counts, kept in first-seen order.
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut seen: Vec<(&str, usize)> = Vec::new();
        for doc in &analyzed {
            for term in doc {
                match position.get(term.as_str()) {
                    Some(&i) => seen[i].1 += 1,
                    None => {
                        position.insert(term.as_str(), seen.len());
                        seen.push((term.as_str(), 1));
                    }
                }
            }
        }

        // Stable sort keeps first-seen order among equal counts.
        let mut ranked: Vec<usize> = (0..seen.len()).collect();
        ranked.sort_by(|&a, &b| seen[b].1.cmp(&seen[a].1));
        ranked.truncate(max_features);
        ranked.sort_unstable();

        let vocabulary: HashMap<String, usize> = ranked
            .iter()
            .enumerate()
            .map(|(col, &i)| (seen[i].0.to_string(), col))
            .collect();

        let counts: Vec<HashMap<usize, usize>> = analyzed
            .iter()
            .map(|doc| count_terms(doc, &vocabulary))
            .collect();

        let mut df = vec![0usize; vocabulary.len()];
        for doc_counts in &counts {
            for &col in doc_counts.keys() {
                df[col] += 1;
            }
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let rows = counts
            .into_iter()
            .map(|c| SparseVector::weighted(c, &idf))
            .collect();

        Ok(Self { vocabulary, idf, rows })
    }

    /// Vectorize a normalized query against the fitted vocabulary.
    /// Terms unseen at fit time contribute nothing.
    pub fn transform(&self, normalized: &str) -> SparseVector {
        let terms = analyze(normalized);
        SparseVector::weighted(count_terms(&terms, &self.vocabulary), &self.idf)
    }

    /// Cosine similarity of `query` against every document, in document order.
    pub fn similarities(&self, query: &SparseVector) -> Result<Vec<f64>, TrainerError> {
        if self.rows.is_empty() {
            return Err(TrainerError::EmptyCorpus);
        }
        Ok(self.rows.iter().map(|row| cosine(query, row)).collect())
    }

    pub fn row(&self, index: usize) -> Option<&SparseVector> {
        self.rows.get(index)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&col| self.idf[col])
    }
}

/// Split a normalized document into its unigram and bigram features.
fn analyze(text: &str) -> Vec<String> {
    let tokens: Vec<&str> = tokenize(text)
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !is_stop_word(t))
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

fn count_terms(terms: &[String], vocabulary: &HashMap<String, usize>) -> HashMap<usize, usize> {
    let mut counts = HashMap::new();
    for term in terms {
        if let Some(&col) = vocabulary.get(term) {
            *counts.entry(col).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_fit_empty_corpus() {
        let docs: Vec<String> = vec![];
        let err = VectorIndex::fit(&docs, DEFAULT_MAX_FEATURES).unwrap_err();
        assert_eq!(err, TrainerError::EmptyCorpus);
    }

    #[test]
    fn test_analyze_drops_stop_words_and_single_chars() {
        let terms = analyze("i love a big pizza");
        assert_eq!(terms, vec!["love", "big", "pizza", "love big", "big pizza"]);
    }

    #[test]
    fn test_bigrams_skip_over_removed_stop_words() {
        let terms = analyze("pizza and pasta");
        assert!(terms.contains(&"pizza pasta".to_string()));
    }

    #[test]
    fn test_smoothed_idf() {
        let index = VectorIndex::fit(&["pizza pasta", "pizza"], DEFAULT_MAX_FEATURES).unwrap();
        assert!((index.idf("pizza").unwrap() - 1.0).abs() < EPS);
        let expected = (3.0f64 / 2.0).ln() + 1.0;
        assert!((index.idf("pasta").unwrap() - expected).abs() < EPS);
        assert!((index.idf("pizza pasta").unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let index = VectorIndex::fit(&["pizza pasta", "pizza", "burgers fries"], DEFAULT_MAX_FEATURES).unwrap();
        for i in 0..index.len() {
            assert!((index.row(i).unwrap().norm() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_similarities_known_values() {
        let index = VectorIndex::fit(&["pizza pasta", "pizza"], DEFAULT_MAX_FEATURES).unwrap();
        let query = index.transform("pizza");
        let sims = index.similarities(&query).unwrap();
        assert_eq!(sims.len(), 2);
        assert!((sims[0] - 0.449441).abs() < 1e-5, "got {}", sims[0]);
        assert!((sims[1] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_out_of_vocabulary_query_scores_zero() {
        let index = VectorIndex::fit(&["hello there"], DEFAULT_MAX_FEATURES).unwrap();
        let query = index.transform("completely unrelated gibberish xyz");
        assert!(query.is_empty());
        assert_eq!(index.similarities(&query).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_vocabulary_cap_prefers_frequent_then_first_seen() {
        let index = VectorIndex::fit(&["alpha beta", "alpha gamma"], 2).unwrap();
        assert_eq!(index.vocabulary_len(), 2);
        assert!(index.contains_term("alpha"));
        assert!(index.contains_term("beta"));
        assert!(!index.contains_term("gamma"));
        assert!(!index.contains_term("alpha beta"));
    }

    #[test]
    fn test_stop_word_only_document_has_zero_row() {
        let index = VectorIndex::fit(&["pizza", "the and of"], DEFAULT_MAX_FEATURES).unwrap();
        assert!(index.row(1).unwrap().is_empty());
        let sims = index.similarities(&index.transform("pizza")).unwrap();
        assert_eq!(sims[1], 0.0);
    }

    #[test]
    fn test_empty_vocabulary_still_fits() {
        let index = VectorIndex::fit(&["the", "a"], DEFAULT_MAX_FEATURES).unwrap();
        assert_eq!(index.vocabulary_len(), 0);
        assert_eq!(index.similarities(&index.transform("the")).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let docs = ["order status please", "refund my order", "shipping takes days"];
        let a = VectorIndex::fit(&docs, DEFAULT_MAX_FEATURES).unwrap();
        let b = VectorIndex::fit(&docs, DEFAULT_MAX_FEATURES).unwrap();
        for i in 0..docs.len() {
            assert_eq!(a.row(i), b.row(i));
        }
    }

    proptest! {
        #[test]
        fn prop_each_document_matches_itself(
            docs in prop::collection::vec("[a-e]{2,4}( [a-e]{2,4}){0,5}", 1..6)
        ) {
            let index = VectorIndex::fit(&docs, DEFAULT_MAX_FEATURES).unwrap();
            for i in 0..index.len() {
                let row = index.row(i).unwrap();
                if row.is_empty() {
                    continue;
                }
                let sims = index.similarities(row).unwrap();
                prop_assert!((sims[i] - 1.0).abs() < 1e-9);
                let max = sims.iter().cloned().fold(f64::MIN, f64::max);
                prop_assert!((max - sims[i]).abs() < 1e-9);
            }
        }
    }
}
