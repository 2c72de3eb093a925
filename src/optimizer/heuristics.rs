// src/optimizer/heuristics.rs
// Rule-based rewriting used when no model is configured.
//
// These are substring and regex checks on the raw text, not a SQL parser.
// Column and table extraction is best effort: quoted identifiers, aliases,
// subqueries and string literals that look like comparisons can all yield
// wrong or missing suggestions, and the rewritten query is never validated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

pub const WILDCARD_REPLACEMENT: &str = "SELECT id, name, created_at";
pub const LIMIT_SUFFIX: &str = " LIMIT 100";
pub const DEFAULT_TABLE_PLACEHOLDER: &str = "table_name";

const NO_FINDINGS_ANALYSIS: &str =
    "No common anti-patterns were detected in this query by the heuristic checks.";

static WHERE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bWHERE\b(.*?)(?:\bORDER\s+BY\b|\bGROUP\s+BY\b|\bLIMIT\b|$)").unwrap()
});

// Word directly followed by a comparison operator; group 1 drops the operator
static FILTER_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w+)\s*(?:\bNOT\s+)?(?:=|<|>|\bLIKE\b|\bIN\b)").unwrap());

static FROM_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bFROM\s+[`"\[]?([\w.]+)"#).unwrap());

static SELECT_WILDCARD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bSELECT\s+\*").unwrap());

// Words the column pattern can catch that are never columns ("x NOT IN (...)")
const NON_COLUMN_WORDS: &[&str] = &["not", "and", "or", "is", "between", "exists", "where"];

const STRUCTURE_SUGGESTIONS: [&str; 2] = [
    "Use ENUM instead of VARCHAR for columns that hold a small, fixed set of values",
    "Add NOT NULL constraints to columns that never store NULL values",
];

const SERVER_SUGGESTIONS: [&str; 2] = [
    "Increase innodb_buffer_pool_size so the working set fits in memory (typically 50-70% of RAM on a dedicated server)",
    "Enable the query cache (query_cache_type = 1) on MySQL versions older than 8.0",
];

/// Checks that can fire during a heuristic rewrite
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicRule {
    FilterColumns,
    WildcardSelect,
    MissingLimit,
}

impl HeuristicRule {
    /// Rough share of the improvement estimate credited to this rule
    fn improvement_percent(&self) -> u32 {
        match self {
            HeuristicRule::FilterColumns => 40,
            HeuristicRule::WildcardSelect => 15,
            HeuristicRule::MissingLimit => 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeuristicRewrite {
    pub optimized_query: String,
    pub analysis: String,
    pub index_suggestions: Vec<String>,
    pub structure_suggestions: Vec<String>,
    pub server_suggestions: Vec<String>,
    pub fired: Vec<HeuristicRule>,
}

impl HeuristicRewrite {
    pub fn performance_improvement(&self) -> String {
        if self.fired.is_empty() {
            return "No significant improvement expected".to_string();
        }
        let percent: u32 = self
            .fired
            .iter()
            .map(HeuristicRule::improvement_percent)
            .sum::<u32>()
            .min(75);
        format!("Up to {}% faster", percent)
    }
}

/// Columns compared against in the WHERE clause, in first-seen order
pub fn filter_columns(query: &str) -> Option<Vec<String>> {
    let clause = WHERE_CLAUSE.captures(query)?.get(1)?.as_str();

    let mut columns: Vec<String> = Vec::new();
    for caps in FILTER_COLUMN.captures_iter(clause) {
        let column = &caps[1];
        if column.chars().all(|c| c.is_ascii_digit())
            || NON_COLUMN_WORDS.contains(&column.to_lowercase().as_str())
        {
            continue;
        }
        if !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }
    Some(columns)
}

/// First identifier after FROM, if any
pub fn primary_table(query: &str) -> Option<String> {
    FROM_TABLE
        .captures(query)
        .map(|caps| caps[1].to_string())
}

/// Apply the fixed rule sequence to `query`. Never fails.
pub fn heuristic_rewrite(query: &str) -> HeuristicRewrite {
    let mut optimized_query = query.to_string();
    let mut notes: Vec<String> = Vec::new();
    let mut index_suggestions = Vec::new();
    let mut fired = Vec::new();

    if let Some(columns) = filter_columns(query) {
        if !columns.is_empty() {
            let table = primary_table(query).unwrap_or_else(|| DEFAULT_TABLE_PLACEHOLDER.to_string());
            for column in &columns {
                index_suggestions.push(format!(
                    "CREATE INDEX idx_{column} ON {table} ({column});",
                    column = column,
                    table = table
                ));
            }
            notes.push(format!(
                "Filter columns detected in the WHERE clause: {}.\nIndexing these columns lets the engine avoid a full table scan.",
                columns.join(", ")
            ));
            fired.push(HeuristicRule::FilterColumns);
        }
    }

    if SELECT_WILDCARD.is_match(&optimized_query) {
        optimized_query = SELECT_WILDCARD
            .replace(&optimized_query, WILDCARD_REPLACEMENT)
            .into_owned();
        notes.push(
            "SELECT * reads every column of the table. Listing only the needed columns reduces I/O and network transfer and can enable covering indexes."
                .to_string(),
        );
        fired.push(HeuristicRule::WildcardSelect);
    }

    if !query.to_uppercase().contains("LIMIT") {
        optimized_query.push_str(LIMIT_SUFFIX);
        notes.push(
            "The query has no LIMIT clause. Added LIMIT 100 to cap the number of rows returned."
                .to_string(),
        );
        fired.push(HeuristicRule::MissingLimit);
    }

    debug!(?fired, indexes = index_suggestions.len(), "Heuristic rewrite complete");

    let analysis = if notes.is_empty() {
        NO_FINDINGS_ANALYSIS.to_string()
    } else {
        notes.join("\n\n")
    };

    HeuristicRewrite {
        optimized_query,
        analysis,
        index_suggestions,
        structure_suggestions: STRUCTURE_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        server_suggestions: SERVER_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        fired,
    }
}
