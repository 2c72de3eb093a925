// src/optimizer/similarity.rs
// Decides whether a previously rated result can be reused for a new query.

use std::collections::HashSet;
use tracing::debug;

use crate::history::{Feedback, HistoryRecord};

/// Score a candidate must strictly exceed to be reused
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
/// Score given when one normalized query contains the other
pub const SUBSTRING_SCORE: f64 = 0.8;

/// Which history records may be reused, and how close they must be.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPolicy {
    pub threshold: f64,
    /// Only records carrying exactly this feedback are candidates
    pub required_feedback: Feedback,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            required_feedback: Feedback::Helpful,
        }
    }
}

impl MatchPolicy {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

pub struct QueryMatcher;

impl QueryMatcher {
    /// Lowercase, collapse whitespace runs, trim
    pub fn normalize(query: &str) -> String {
        query
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Similarity of two queries in [0.0, 1.0]. Symmetric.
    pub fn similarity(a: &str, b: &str) -> f64 {
        Self::normalized_similarity(&Self::normalize(a), &Self::normalize(b))
    }

    fn normalized_similarity(a_norm: &str, b_norm: &str) -> f64 {
        if a_norm == b_norm {
            return 1.0;
        }

        // Departs from plain containment on purpose: an empty string is a
        // substring of everything, so a blank side falls through to Jaccard (0)
        if !a_norm.is_empty() && !b_norm.is_empty() && (a_norm.contains(b_norm) || b_norm.contains(a_norm)) {
            return SUBSTRING_SCORE;
        }

        let a_words: HashSet<_> = a_norm.split_whitespace().collect();
        let b_words: HashSet<_> = b_norm.split_whitespace().collect();

        let intersection = a_words.intersection(&b_words).count();
        let union = a_words.len() + b_words.len() - intersection;
        if union == 0 {
            return 0.0;
        }

        intersection as f64 / union as f64
    }

    /// First record in `history` order that passes `policy`
    pub fn find_match<'a>(
        query: &str,
        history: &'a [HistoryRecord],
        policy: &MatchPolicy,
    ) -> Option<&'a HistoryRecord> {
        let query_norm = Self::normalize(query);

        history
            .iter()
            .filter(|record| record.feedback == Some(policy.required_feedback))
            .find(|record| {
                let score = Self::normalized_similarity(
                    &query_norm,
                    &Self::normalize(&record.original_query),
                );
                debug!(id = record.id, score, threshold = policy.threshold, "Scored history record");
                score > policy.threshold
            })
    }
}

/// Reusable helpful record for `query` under the default policy
pub fn find_reusable_match<'a>(query: &str, history: &'a [HistoryRecord]) -> Option<&'a HistoryRecord> {
    QueryMatcher::find_match(query, history, &MatchPolicy::default())
}
