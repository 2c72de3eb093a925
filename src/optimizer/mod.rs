// src/optimizer/mod.rs
// Query optimization: history reuse, heuristic rewriting and the LLM path.

pub mod heuristics;
pub mod prompt;
pub mod response;
pub mod service;
pub mod similarity;

pub use heuristics::{heuristic_rewrite, HeuristicRewrite};
pub use prompt::build_optimization_prompt;
pub use response::parse_optimization_response;
pub use service::{OptimizerMode, OptimizerService};
pub use similarity::{find_reusable_match, MatchPolicy, QueryMatcher};

use serde::{Deserialize, Serialize};

/// Where an optimization result came from.
///
/// `OpenAi` tags every freshly produced result, whichever backend
/// (remote model or heuristic rules) produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Source {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "history")]
    History,
}

/// Incoming optimization request. Only `sql_query` drives the heuristics;
/// the rest is context forwarded to the model prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    #[serde(default)]
    pub sql_query: Option<String>,
    #[serde(default)]
    pub table_structure: Option<String>,
    #[serde(default)]
    pub existing_indexes: Option<String>,
    #[serde(default)]
    pub performance_issue: Option<String>,
    #[serde(default)]
    pub explain_results: Option<String>,
    #[serde(default)]
    pub server_info: Option<String>,
}

impl OptimizeRequest {
    pub fn new(sql_query: impl Into<String>) -> Self {
        Self {
            sql_query: Some(sql_query.into()),
            ..Default::default()
        }
    }
}

/// Result of one optimization, returned to the caller and persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationCandidate {
    pub original_query: String,
    pub optimized_query: String,
    pub analysis: String,
    pub performance_improvement: String,
    pub index_suggestions: Vec<String>,
    pub structure_suggestions: Vec<String>,
    pub server_suggestions: Vec<String>,
    pub id: i64,
    pub source: Source,
}

impl OptimizationCandidate {
    /// Replay a stored record as a history-sourced result
    pub fn from_history(record: &crate::history::HistoryRecord) -> Self {
        Self {
            original_query: record.original_query.clone(),
            optimized_query: record.optimized_query.clone(),
            analysis: record.analysis.clone(),
            performance_improvement: record.performance_improvement.clone(),
            index_suggestions: record.index_suggestions.clone(),
            structure_suggestions: record.structure_suggestions.clone(),
            server_suggestions: record.server_suggestions.clone(),
            id: record.id,
            source: Source::History,
        }
    }
}
