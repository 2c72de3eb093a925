// src/optimizer/prompt.rs

use super::OptimizeRequest;

pub const SYSTEM_PROMPT: &str = "You are a database optimization expert with deep knowledge of MySQL performance tuning. Respond only with valid JSON.";

const RESPONSE_INSTRUCTIONS: &str = r#"
Please provide a complete response in JSON format with the following fields:
1. "optimizedQuery": The optimized SQL query
2. "analysis": Detailed analysis of performance issues in the original query
3. "performanceImprovement": Estimated performance improvement (e.g., "Up to 75% faster")
4. "indexSuggestions": Array of suggested indexes to add
5. "structureSuggestions": Array of suggested table structure improvements
6. "serverSuggestions": Array of suggested server configuration changes

Format your response as a valid JSON object."#;

/// Build the user prompt for a model call. Context sections that are
/// absent or blank are left out.
pub fn build_optimization_prompt(sql_query: &str, request: &OptimizeRequest) -> String {
    let mut prompt = format!(
        "I need to optimize the following MySQL query:\n\n```sql\n{}\n```\n",
        sql_query.trim()
    );

    let sections = [
        ("Table structure and record counts", &request.table_structure),
        ("Existing indexes", &request.existing_indexes),
        ("Current performance issues", &request.performance_issue),
        ("EXPLAIN results", &request.explain_results),
        ("Database server information", &request.server_info),
    ];

    for (heading, value) in sections {
        if let Some(text) = value.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            prompt.push_str(&format!("\n{}:\n{}\n", heading, text));
        }
    }

    prompt.push_str(RESPONSE_INSTRUCTIONS);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_query_block() {
        let req = OptimizeRequest::new("SELECT * FROM users");
        let prompt = build_optimization_prompt("SELECT * FROM users", &req);
        assert!(prompt.contains("```sql\nSELECT * FROM users\n```"));
        assert!(prompt.contains("\"optimizedQuery\""));
        assert!(!prompt.contains("Existing indexes"));
    }

    #[test]
    fn test_prompt_includes_non_blank_context() {
        let req = OptimizeRequest {
            sql_query: Some("SELECT 1".into()),
            existing_indexes: Some("PRIMARY KEY (id)".into()),
            explain_results: Some("   ".into()),
            server_info: Some("MySQL 5.7, 16GB RAM".into()),
            ..Default::default()
        };
        let prompt = build_optimization_prompt("SELECT 1", &req);
        assert!(prompt.contains("Existing indexes:\nPRIMARY KEY (id)\n"));
        assert!(prompt.contains("Database server information:\nMySQL 5.7, 16GB RAM\n"));
        assert!(!prompt.contains("EXPLAIN results"));
        assert!(!prompt.contains("Table structure"));
    }
}
