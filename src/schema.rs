//! Schema introspection over the tool server.
//!
//! Turns the `list_tables` and `describe_table` tool payloads into a
//! normalised schema model. The server returns MySQL-shaped JSON text:
//! `list_tables` yields an array of single-key objects keyed
//! `Tables_in_<database>`, and `describe_table` yields an array of column
//! descriptors with `Field`, `Type`, `Null`, `Key` (plus `Default` and
//! `Extra`, which this client ignores).
//!
//! Introspection has partial-failure semantics: one table that fails to
//! describe is recorded in the report without voiding the rest.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::mcp::client::{ClientError, Session};
use crate::mcp::protocol::Tool;
use crate::mcp::transport::Transport;

/// Key prefix marking table-name rows in the `list_tables` payload.
///
/// The suffix is the active database name, which is accepted as-is rather
/// than checked against the configured database.
pub const TABLE_LIST_PREFIX: &str = "Tables_in_";

/// Errors that can occur during schema introspection.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A tool payload did not have the expected shape.
    #[error("unexpected {context} payload: {detail}")]
    Parse {
        /// Which payload was being parsed.
        context: String,
        /// What was wrong with it.
        detail: String,
    },

    /// The tool reply carried no textual payload to parse.
    #[error("tool `{tool}` returned no textual payload")]
    NoText {
        /// The tool that was called.
        tool: &'static str,
    },

    /// The underlying tool call failed.
    #[error("introspection tool call failed")]
    Client(#[from] ClientError),
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Declared SQL type, as the server reports it.
    pub column_type: String,
    /// Whether the column admits NULL.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

/// One table and its columns, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in the order the server reported them.
    pub columns: Vec<ColumnSchema>,
}

/// A table that could not be described, kept alongside the reason.
#[derive(Debug)]
pub struct TableFailure {
    /// The table that failed.
    pub table: String,
    /// Why it failed.
    pub error: SchemaError,
}

/// The outcome of introspecting a whole database.
///
/// `tables` holds every successfully described table; `failures` records
/// the ones that could not be described. An empty `failures` means the
/// schema is complete.
#[derive(Debug, Default)]
pub struct SchemaReport {
    /// Successfully described tables, in listing order.
    pub tables: Vec<TableSchema>,
    /// Tables that failed to describe.
    pub failures: Vec<TableFailure>,
}

/// Wire shape of one `describe_table` row.
#[derive(Debug, Deserialize)]
struct ColumnRow {
    #[serde(rename = "Field")]
    field: String,
    #[serde(rename = "Type")]
    column_type: String,
    #[serde(rename = "Null")]
    null: String,
    #[serde(rename = "Key")]
    key: String,
}

/// Parses the `list_tables` payload into table names, preserving order.
///
/// Any key carrying the [`TABLE_LIST_PREFIX`] marker is accepted regardless
/// of which database name follows it; rows without such a key contribute
/// nothing.
///
/// # Errors
///
/// Returns [`SchemaError::Parse`] if the payload is not a JSON array of
/// objects with string values under the marker keys.
pub fn parse_table_names(text: &str) -> Result<Vec<String>, SchemaError> {
    let parse_error = |detail: String| SchemaError::Parse {
        context: "table list".to_string(),
        detail,
    };

    let rows: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;

    let mut names = Vec::new();
    for row in &rows {
        for (key, value) in row {
            if key.starts_with(TABLE_LIST_PREFIX) {
                let name = value.as_str().ok_or_else(|| {
                    parse_error(format!("value under `{key}` is not a string"))
                })?;
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

/// Parses the `describe_table` payload into a [`TableSchema`].
///
/// `Key == "PRI"` maps to the primary-key flag and `Null == "YES"` to the
/// nullable flag; unknown descriptor fields are ignored.
///
/// # Errors
///
/// Returns [`SchemaError::Parse`] on malformed rows.
pub fn parse_columns(table: &str, text: &str) -> Result<TableSchema, SchemaError> {
    let rows: Vec<ColumnRow> = serde_json::from_str(text).map_err(|e| SchemaError::Parse {
        context: format!("column descriptors for table `{table}`"),
        detail: e.to_string(),
    })?;

    let columns = rows
        .into_iter()
        .map(|row| ColumnSchema {
            name: row.field,
            column_type: row.column_type,
            nullable: row.null == "YES",
            primary_key: row.key == "PRI",
        })
        .collect();

    Ok(TableSchema {
        name: table.to_string(),
        columns,
    })
}

/// Lists the tables of the connected database, in server order.
///
/// # Errors
///
/// Returns an error if the tool call fails or the payload cannot be parsed.
pub async fn list_table_names<T: Transport>(
    session: &mut Session<T>,
) -> Result<Vec<String>, SchemaError> {
    let result = session.call_tool(Tool::ListTables, json!({})).await?;
    let text = result.text().ok_or(SchemaError::NoText {
        tool: Tool::ListTables.name(),
    })?;
    parse_table_names(text)
}

/// Describes one table.
///
/// # Errors
///
/// Returns an error if the tool call fails or the payload cannot be parsed.
pub async fn describe_table<T: Transport>(
    session: &mut Session<T>,
    table: &str,
) -> Result<TableSchema, SchemaError> {
    let result = session
        .call_tool(Tool::DescribeTable, json!({"table": table}))
        .await?;
    let text = result.text().ok_or(SchemaError::NoText {
        tool: Tool::DescribeTable.name(),
    })?;
    parse_columns(table, text)
}

/// Introspects the whole database: every listed table, described.
///
/// A table that fails to describe is recorded in the report's `failures`
/// instead of aborting the rest.
///
/// # Errors
///
/// Returns an error only if the table listing itself fails.
pub async fn introspect<T: Transport>(
    session: &mut Session<T>,
) -> Result<SchemaReport, SchemaError> {
    let names = list_table_names(session).await?;
    debug!(count = names.len(), "listed tables");

    let mut report = SchemaReport::default();
    for name in names {
        match describe_table(session, &name).await {
            Ok(table) => report.tables.push(table),
            Err(error) => {
                warn!(table = %name, error = %error, "could not describe table");
                report.failures.push(TableFailure { table: name, error });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_in_listing_order() {
        let text = r#"[{"Tables_in_selldata": "orders"}, {"Tables_in_selldata": "users"}]"#;
        let names = parse_table_names(text).unwrap();
        assert_eq!(names, vec!["orders", "users"]);
    }

    #[test]
    fn table_names_accept_any_database_suffix() {
        let text = r#"[{"Tables_in_other_db": "logs"}]"#;
        let names = parse_table_names(text).unwrap();
        assert_eq!(names, vec!["logs"]);
    }

    #[test]
    fn table_names_reject_non_array() {
        let result = parse_table_names(r#"{"Tables_in_selldata": "orders"}"#);
        assert!(matches!(result, Err(SchemaError::Parse { .. })));
    }

    #[test]
    fn table_names_reject_non_string_value() {
        let result = parse_table_names(r#"[{"Tables_in_selldata": 42}]"#);
        assert!(matches!(result, Err(SchemaError::Parse { .. })));
    }

    #[test]
    fn column_descriptor_round_trip() {
        let text = r#"[{"Field": "id", "Type": "int", "Null": "NO", "Key": "PRI", "Default": null, "Extra": "auto_increment"}]"#;
        let schema = parse_columns("orders", text).unwrap();
        assert_eq!(schema.name, "orders");
        assert_eq!(
            schema.columns,
            vec![ColumnSchema {
                name: "id".to_string(),
                column_type: "int".to_string(),
                nullable: false,
                primary_key: true,
            }]
        );
    }

    #[test]
    fn nullable_non_key_column() {
        let text = r#"[{"Field": "note", "Type": "varchar(255)", "Null": "YES", "Key": ""}]"#;
        let schema = parse_columns("orders", text).unwrap();
        assert!(schema.columns[0].nullable);
        assert!(!schema.columns[0].primary_key);
    }

    #[test]
    fn columns_preserve_declaration_order() {
        let text = r#"[
            {"Field": "id", "Type": "int", "Null": "NO", "Key": "PRI"},
            {"Field": "name", "Type": "varchar(64)", "Null": "NO", "Key": ""},
            {"Field": "created_at", "Type": "datetime", "Null": "YES", "Key": ""}
        ]"#;
        let schema = parse_columns("users", text).unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "created_at"]);
    }

    #[test]
    fn malformed_descriptor_row_is_rejected() {
        let result = parse_columns("orders", r#"[{"Field": "id"}]"#);
        assert!(matches!(result, Err(SchemaError::Parse { .. })));
    }

    mod introspection {
        use serde_json::{json, Value};

        use crate::mcp::client::{Session, SessionOptions};
        use crate::mcp::transport::testing::ScriptedTransport;

        use super::super::*;

        fn handshake_reply() -> Value {
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {"protocolVersion": "2024-11-05"}
            })
        }

        fn text_reply(id: i64, text: &str) -> Value {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {"content": [{"type": "text", "text": text}]}
            })
        }

        async fn ready_session(replies: Vec<Option<Value>>) -> Session<ScriptedTransport> {
            let mut all = vec![Some(handshake_reply())];
            all.extend(replies);
            let mut session =
                Session::with_transport(ScriptedTransport::new(all), SessionOptions::default());
            session.initialize().await.unwrap();
            session
        }

        #[tokio::test]
        async fn one_bad_table_does_not_void_the_schema() {
            let columns = r#"[{"Field":"id","Type":"int","Null":"NO","Key":"PRI"}]"#;
            let mut session = ready_session(vec![
                Some(text_reply(
                    2,
                    r#"[{"Tables_in_selldata":"orders"},{"Tables_in_selldata":"users"},{"Tables_in_selldata":"events"}]"#,
                )),
                Some(text_reply(3, columns)),
                Some(json!({
                    "jsonrpc": "2.0",
                    "id": 4,
                    "error": {"code": -32000, "message": "table is marked as crashed"}
                })),
                Some(text_reply(5, columns)),
            ])
            .await;

            let report = introspect(&mut session).await.unwrap();

            // Introspection continues past the failed table.
            let names: Vec<&str> = report.tables.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["orders", "events"]);
            assert_eq!(report.failures.len(), 1);
            assert_eq!(report.failures[0].table, "users");
        }

        #[tokio::test]
        async fn listing_failure_fails_the_whole_introspection() {
            let mut session = ready_session(vec![Some(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "error": {"code": -32000, "message": "not connected"}
            }))])
            .await;

            let result = introspect(&mut session).await;
            assert!(matches!(result, Err(SchemaError::Client(_))));
        }

        #[tokio::test]
        async fn reply_without_text_is_no_text_not_empty() {
            let mut session = ready_session(vec![Some(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": {"content": []}
            }))])
            .await;

            let result = list_table_names(&mut session).await;
            assert!(matches!(result, Err(SchemaError::NoText { .. })));
        }
    }
}
