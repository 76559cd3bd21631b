//! Prompt construction for the completion request.
//!
//! The system prompt carries the schema grounding so the generated SQL
//! references real tables and columns; the user prompt pins the reply to an
//! exact two-field format the parser knows how to read.

use std::fmt::Write as _;

use crate::schema::TableSchema;

/// Label introducing the SQL field in the completion.
pub(crate) const SQL_LABEL: &str = "SQL:";

/// Labels introducing the explanation field.
///
/// The prompt requests `Explanation:`, but the upstream model frequently
/// answers with `解释:`, so the parser accepts both.
pub(crate) const EXPLANATION_LABELS: [&str; 2] = ["Explanation:", "解释:"];

/// Builds the system prompt, enumerating the schema when one is supplied.
#[must_use]
pub fn build_system_prompt(schema: Option<&[TableSchema]>) -> String {
    let mut prompt = String::from(
        "You are an expert SQL engineer. Translate the user's natural-language \
         request into a single SQL statement for the connected MySQL database.",
    );

    let Some(tables) = schema else {
        return prompt;
    };

    prompt.push_str("\n\nThe database schema is:\n");
    for table in tables {
        let _ = write!(prompt, "\nTable: {}\nColumns:\n", table.name);
        for column in &table.columns {
            let key = if column.primary_key { "primary key, " } else { "" };
            let null = if column.nullable {
                "nullable"
            } else {
                "not nullable"
            };
            let _ = writeln!(
                prompt,
                "- {}: {} ({key}{null})",
                column.name, column.column_type
            );
        }
    }
    prompt
}

/// Builds the user prompt demanding the two labelled fields and nothing else.
#[must_use]
pub fn build_user_prompt(natural_language: &str) -> String {
    format!(
        "Translate the following request into a SQL query:\n\n{natural_language}\n\n\
         Return only the SQL statement and a short explanation, in exactly this format:\n\n\
         {SQL_LABEL} <the SQL statement>\n{} <one-sentence explanation>",
        EXPLANATION_LABELS[0]
    )
}

#[cfg(test)]
mod tests {
    use crate::schema::ColumnSchema;

    use super::*;

    fn orders_table() -> TableSchema {
        TableSchema {
            name: "orders".to_string(),
            columns: vec![
                ColumnSchema {
                    name: "id".to_string(),
                    column_type: "int".to_string(),
                    nullable: false,
                    primary_key: true,
                },
                ColumnSchema {
                    name: "note".to_string(),
                    column_type: "varchar(255)".to_string(),
                    nullable: true,
                    primary_key: false,
                },
            ],
        }
    }

    #[test]
    fn system_prompt_without_schema_has_no_table_section() {
        let prompt = build_system_prompt(None);
        assert!(!prompt.contains("Table:"));
    }

    #[test]
    fn system_prompt_enumerates_tables_and_columns() {
        let tables = [orders_table()];
        let prompt = build_system_prompt(Some(&tables));
        assert!(prompt.contains("Table: orders"));
        assert!(prompt.contains("- id: int (primary key, not nullable)"));
        assert!(prompt.contains("- note: varchar(255) (nullable)"));
    }

    #[test]
    fn user_prompt_demands_both_labels() {
        let prompt = build_user_prompt("how many orders shipped last week");
        assert!(prompt.contains("how many orders shipped last week"));
        assert!(prompt.contains("SQL:"));
        assert!(prompt.contains("Explanation:"));
    }
}
