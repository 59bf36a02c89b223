//! Descriptive statistics over a bot's normalized scripts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::trainer::error::TrainerError;
use crate::trainer::normalize::tokenize;

/// Default number of most frequent terms kept in a profile.
pub const DEFAULT_TOP_TERMS: usize = 10;

/// Summary of a corpus, stored on the bot after each training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    /// Unique tokens across the whole corpus.
    pub distinct_terms: usize,
    /// Mean tokens per document.
    pub avg_length: f64,
    /// Most frequent tokens, highest count first.
    pub top_terms: Vec<(String, usize)>,
}

pub fn summarize<S: AsRef<str>>(documents: &[S], top_n: usize) -> Result<PersonalityProfile, TrainerError> {
    if documents.is_empty() {
        return Err(TrainerError::EmptyCorpus);
    }

    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut total_tokens = 0usize;

    for doc in documents {
        for token in tokenize(doc.as_ref()) {
            total_tokens += 1;
            match position.get(token) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    position.insert(token, counts.len());
                    counts.push((token, 1));
                }
            }
        }
    }

    let distinct_terms = counts.len();
    // Stable: equal counts stay in first-occurrence order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let top_terms = counts
        .into_iter()
        .take(top_n)
        .map(|(term, count)| (term.to_string(), count))
        .collect();

    Ok(PersonalityProfile {
        distinct_terms,
        avg_length: total_tokens as f64 / documents.len() as f64,
        top_terms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_corpus() {
        let docs: Vec<&str> = vec![];
        assert_eq!(summarize(&docs, DEFAULT_TOP_TERMS).unwrap_err(), TrainerError::EmptyCorpus);
    }

    #[test]
    fn test_counts_and_average() {
        let profile = summarize(&["i love pizza", "i love pasta"], DEFAULT_TOP_TERMS).unwrap();
        assert_eq!(profile.distinct_terms, 4);
        assert!((profile.avg_length - 3.0).abs() < f64::EPSILON);
        assert_eq!(profile.top_terms[0], ("i".to_string(), 2));
        assert_eq!(profile.top_terms[1], ("love".to_string(), 2));
        assert_eq!(profile.top_terms[2], ("pizza".to_string(), 1));
        assert_eq!(profile.top_terms[3], ("pasta".to_string(), 1));
    }

    #[test]
    fn test_ties_keep_first_occurrence_order() {
        let profile = summarize(&["zeta alpha", "mid zeta alpha mid"], DEFAULT_TOP_TERMS).unwrap();
        let terms: Vec<&str> = profile.top_terms.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(terms, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_top_terms_truncated() {
        let doc = "a b c d e f g h i j k l";
        let profile = summarize(&[doc], 10).unwrap();
        assert_eq!(profile.distinct_terms, 12);
        assert_eq!(profile.top_terms.len(), 10);
        assert_eq!(profile.top_terms.last().unwrap().0, "j");
    }

    #[test]
    fn test_empty_documents_count_toward_average() {
        let profile = summarize(&["one two", ""], DEFAULT_TOP_TERMS).unwrap();
        assert!((profile.avg_length - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_profile_serializes_to_json() {
        let profile = summarize(&["hello hello world"], 2).unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        let back: PersonalityProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
        assert!(json.contains("\"top_terms\":[[\"hello\",2],[\"world\",1]]"));
    }
}
