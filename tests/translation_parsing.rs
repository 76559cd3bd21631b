//! Integration tests for completion parsing and prompt grounding.

use mysql_mcp_client::schema::{ColumnSchema, TableSchema};
use mysql_mcp_client::translate::{build_system_prompt, build_user_prompt, parse_completion};

// =============================================================================
// Completion Parsing Tests
// =============================================================================

#[test]
fn test_labelled_completion_parses_both_fields() {
    let translation = parse_completion("SQL: SELECT * FROM orders\n解释: returns all orders");
    assert_eq!(translation.sql, "SELECT * FROM orders");
    assert_eq!(translation.explanation, "returns all orders");
}

#[test]
fn test_english_labels_parse_identically() {
    let translation =
        parse_completion("SQL: SELECT COUNT(*) FROM users\nExplanation: counts users");
    assert_eq!(translation.sql, "SELECT COUNT(*) FROM users");
    assert_eq!(translation.explanation, "counts users");
}

#[test]
fn test_fenced_sql_is_unwrapped() {
    let completion = "SQL: ```sql\nSELECT id FROM orders WHERE total > 100\n```\n解释: large orders";
    let translation = parse_completion(completion);
    assert_eq!(translation.sql, "SELECT id FROM orders WHERE total > 100");
    assert_eq!(translation.explanation, "large orders");
}

#[test]
fn test_unlabelled_completion_becomes_explanation() {
    let completion = "I need more context about your tables to write that query.";
    let translation = parse_completion(completion);
    assert_eq!(translation.sql, "");
    assert_eq!(translation.explanation, completion);
}

#[test]
fn test_line_scan_fallback() {
    let completion = "Here is what I came up with.\nSQL: SELECT 1\ntrailing note";
    let translation = parse_completion(completion);
    assert_eq!(translation.sql, "SELECT 1");
}

// =============================================================================
// Prompt Grounding Tests
// =============================================================================

fn sample_schema() -> Vec<TableSchema> {
    vec![TableSchema {
        name: "orders".to_string(),
        columns: vec![
            ColumnSchema {
                name: "id".to_string(),
                column_type: "int".to_string(),
                nullable: false,
                primary_key: true,
            },
            ColumnSchema {
                name: "total".to_string(),
                column_type: "decimal(10,2)".to_string(),
                nullable: true,
                primary_key: false,
            },
        ],
    }]
}

#[test]
fn test_system_prompt_contains_every_column() {
    let schema = sample_schema();
    let prompt = build_system_prompt(Some(&schema));
    assert!(prompt.contains("Table: orders"));
    assert!(prompt.contains("id: int"));
    assert!(prompt.contains("total: decimal(10,2)"));
    assert!(prompt.contains("primary key"));
    assert!(prompt.contains("nullable"));
}

#[test]
fn test_user_prompt_embeds_the_question_and_format() {
    let prompt = build_user_prompt("total revenue per user");
    assert!(prompt.contains("total revenue per user"));
    assert!(prompt.contains("SQL:"));
    assert!(prompt.contains("Explanation:"));
}
