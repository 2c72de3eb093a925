// src/optimizer/response.rs
// Turns raw model output into an optimization result.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::llm::LLMError;

/// Fields the model is asked for. Anything missing or `null` defaults to
/// empty; values of an unexpected shape are kept as their JSON text.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelOptimization {
    #[serde(deserialize_with = "lenient_string")]
    pub optimized_query: String,
    #[serde(deserialize_with = "lenient_string")]
    pub analysis: String,
    #[serde(deserialize_with = "lenient_string")]
    pub performance_improvement: String,
    #[serde(deserialize_with = "lenient_list")]
    pub index_suggestions: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub structure_suggestions: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub server_suggestions: Vec<String>,
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(value_to_text).collect(),
        single => value_to_text(single).into_iter().collect(),
    })
}

/// Body of the first ```json fence, else of the first ``` fence, else the
/// whole text
pub fn extract_json_block(content: &str) -> &str {
    let fenced = |marker: &str| {
        content.split_once(marker).map(|(_, rest)| {
            rest.split_once("```").map(|(body, _)| body).unwrap_or(rest)
        })
    };

    if content.contains("```json") {
        if let Some(body) = fenced("```json") {
            return body.trim();
        }
    } else if content.contains("```") {
        if let Some(body) = fenced("```") {
            return body.trim();
        }
    }
    content.trim()
}

pub fn parse_optimization_response(content: &str) -> Result<ModelOptimization, LLMError> {
    let json = extract_json_block(content);
    serde_json::from_str::<ModelOptimization>(json).map_err(|e| {
        warn!(error = %e, response_len = content.len(), "Model response is not valid optimization JSON");
        LLMError::InvalidResponse(format!("could not parse optimization JSON: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let parsed = parse_optimization_response(
            r#"{"optimizedQuery":"SELECT id FROM t","analysis":"ok","indexSuggestions":["CREATE INDEX i ON t (a);"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.optimized_query, "SELECT id FROM t");
        assert_eq!(parsed.index_suggestions.len(), 1);
        assert_eq!(parsed.performance_improvement, "");
        assert!(parsed.server_suggestions.is_empty());
    }

    #[test]
    fn test_json_fence() {
        let content = "Here you go:\n```json\n{\"optimizedQuery\": \"SELECT 1\"}\n```\nDone.";
        assert_eq!(extract_json_block(content), "{\"optimizedQuery\": \"SELECT 1\"}");
        let parsed = parse_optimization_response(content).unwrap();
        assert_eq!(parsed.optimized_query, "SELECT 1");
    }

    #[test]
    fn test_bare_fence() {
        let content = "```\n{\"analysis\": \"slow\"}\n```";
        let parsed = parse_optimization_response(content).unwrap();
        assert_eq!(parsed.analysis, "slow");
    }

    #[test]
    fn test_null_fields_become_empty() {
        let parsed = parse_optimization_response(
            r#"{"optimizedQuery":"SELECT 1","analysis":null,"performanceImprovement":null,"serverSuggestions":null}"#,
        )
        .unwrap();
        assert_eq!(parsed.optimized_query, "SELECT 1");
        assert_eq!(parsed.analysis, "");
        assert_eq!(parsed.performance_improvement, "");
        assert!(parsed.server_suggestions.is_empty());
    }

    #[test]
    fn test_non_string_suggestions_are_kept_as_text() {
        let parsed = parse_optimization_response(
            r#"{"optimizedQuery":"SELECT 1","performanceImprovement":35,"indexSuggestions":[{"sql":"CREATE INDEX i ON t (a);"},"CREATE INDEX j ON t (b);",null],"structureSuggestions":"Use INT for ids"}"#,
        )
        .unwrap();
        assert_eq!(parsed.performance_improvement, "35");
        assert_eq!(
            parsed.index_suggestions,
            vec![
                r#"{"sql":"CREATE INDEX i ON t (a);"}"#.to_string(),
                "CREATE INDEX j ON t (b);".to_string(),
            ]
        );
        assert_eq!(parsed.structure_suggestions, vec!["Use INT for ids".to_string()]);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = parse_optimization_response("I think you should add an index.").unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse(_)));
    }
}
