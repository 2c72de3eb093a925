// src/history/mod.rs
// Optimization history: records, feedback tags and the store abstraction.
// The matcher and rewriter never touch a store directly; the optimizer
// service reads a snapshot through `HistoryStore::get` and hands it over.

pub mod json_store;
pub mod memory_store;

pub use json_store::JsonHistoryStore;
pub use memory_store::InMemoryHistoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::optimizer::{OptimizationCandidate, Source};

/// User rating attached to a history record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Helpful => "helpful",
            Feedback::NotHelpful => "not_helpful",
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One past optimization as persisted by a `HistoryStore`.
///
/// Suggestion lists and the improvement estimate default to empty so that
/// entries written without them still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub original_query: String,
    pub optimized_query: String,
    pub analysis: String,
    #[serde(default)]
    pub performance_improvement: String,
    #[serde(default)]
    pub index_suggestions: Vec<String>,
    #[serde(default)]
    pub structure_suggestions: Vec<String>,
    #[serde(default)]
    pub server_suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

impl HistoryRecord {
    pub fn from_candidate(candidate: &OptimizationCandidate, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: candidate.id,
            timestamp,
            original_query: candidate.original_query.clone(),
            optimized_query: candidate.optimized_query.clone(),
            analysis: candidate.analysis.clone(),
            performance_improvement: candidate.performance_improvement.clone(),
            index_suggestions: candidate.index_suggestions.clone(),
            structure_suggestions: candidate.structure_suggestions.clone(),
            server_suggestions: candidate.server_suggestions.clone(),
            feedback: None,
            source: Some(candidate.source),
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write history file {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("history file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("history serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("duplicate history id: {0}")]
    DuplicateId(i64),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Storage for optimization history.
///
/// `get` returns records newest first; that order is also the scan order
/// used by the similarity matcher. `update_feedback` and `remove` report
/// whether a record with the id existed.
pub trait HistoryStore: Send + Sync {
    fn get(&self) -> HistoryResult<Vec<HistoryRecord>>;
    fn append(&self, record: HistoryRecord) -> HistoryResult<()>;
    fn update_feedback(&self, id: i64, feedback: Feedback) -> HistoryResult<bool>;
    fn remove(&self, id: i64) -> HistoryResult<bool>;
    fn clear(&self) -> HistoryResult<usize>;
}

/// Shared list mutations used by every store implementation
pub(crate) fn insert_newest_first(records: &mut Vec<HistoryRecord>, record: HistoryRecord) -> HistoryResult<()> {
    if records.iter().any(|r| r.id == record.id) {
        return Err(HistoryError::DuplicateId(record.id));
    }
    records.insert(0, record);
    Ok(())
}

pub(crate) fn set_feedback(records: &mut [HistoryRecord], id: i64, feedback: Feedback) -> bool {
    match records.iter_mut().find(|r| r.id == id) {
        Some(record) => {
            record.feedback = Some(feedback);
            true
        }
        None => false,
    }
}

pub(crate) fn remove_by_id(records: &mut Vec<HistoryRecord>, id: i64) -> bool {
    let before = records.len();
    records.retain(|r| r.id != id);
    records.len() != before
}

#[cfg(test)]
pub(crate) fn sample_record(id: i64, query: &str, feedback: Option<Feedback>) -> HistoryRecord {
    HistoryRecord {
        id,
        timestamp: Utc::now(),
        original_query: query.to_string(),
        optimized_query: format!("{} LIMIT 100", query),
        analysis: "cached analysis".to_string(),
        performance_improvement: "Up to 25% faster".to_string(),
        index_suggestions: Vec::new(),
        structure_suggestions: Vec::new(),
        server_suggestions: Vec::new(),
        feedback,
        source: Some(Source::OpenAi),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_serde_names() {
        assert_eq!(serde_json::to_string(&Feedback::Helpful).unwrap(), "\"helpful\"");
        assert_eq!(serde_json::to_string(&Feedback::NotHelpful).unwrap(), "\"not_helpful\"");
        let parsed: Feedback = serde_json::from_str("\"not_helpful\"").unwrap();
        assert_eq!(parsed, Feedback::NotHelpful);
    }

    #[test]
    fn test_record_loads_without_optional_fields() {
        let json = r#"{
            "id": 1700000000000,
            "timestamp": "2024-01-01T00:00:00Z",
            "originalQuery": "SELECT * FROM orders",
            "optimizedQuery": "SELECT id FROM orders LIMIT 100",
            "analysis": "ok"
        }"#;
        let record: HistoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 1_700_000_000_000);
        assert!(record.feedback.is_none());
        assert!(record.index_suggestions.is_empty());
        assert!(record.source.is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut records = vec![sample_record(1, "SELECT 1", None)];
        let err = insert_newest_first(&mut records, sample_record(1, "SELECT 2", None));
        assert!(matches!(err, Err(HistoryError::DuplicateId(1))));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_feedback_overwrite() {
        let mut records = vec![sample_record(7, "SELECT 1", Some(Feedback::NotHelpful))];
        assert!(set_feedback(&mut records, 7, Feedback::Helpful));
        assert_eq!(records[0].feedback, Some(Feedback::Helpful));
        assert!(!set_feedback(&mut records, 8, Feedback::Helpful));
    }
}
