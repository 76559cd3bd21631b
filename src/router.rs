//! SQL statement classification and routing.
//!
//! Statements are classified by their leading keyword: `SELECT` (after
//! trimming, ASCII case-insensitive) routes to the `query` tool, everything
//! else to the `execute` tool. The rule is deliberately narrow — no comment
//! stripping, no multi-statement handling — matching the tool server's own
//! expectations.
//!
//! Parameter binding is defined in the wire contract (`params`) but unused:
//! this client always sends an empty parameter list, so callers must inline
//! literals.

use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::mcp::client::{ClientError, Session};
use crate::mcp::protocol::Tool;
use crate::mcp::transport::Transport;

/// Errors that can occur while routing a statement.
#[derive(Error, Debug)]
pub enum RouterError {
    /// The statement was empty or whitespace-only.
    #[error("SQL statement is empty")]
    EmptyStatement,

    /// A write statement reached a read-only entry point.
    #[error("statement is not allowed here: only SELECT may run on the read-only path")]
    OperationNotAllowed,

    /// The underlying tool call failed.
    #[error("statement execution failed")]
    Client(#[from] ClientError),
}

/// Read/write classification of a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A retrieval statement, routed to the `query` tool.
    Read,
    /// A mutating statement, routed to the `execute` tool.
    Write,
}

/// The normalised payload of an executed statement.
///
/// The tool server returns results as text; when that text decodes as JSON
/// it is surfaced decoded, otherwise verbatim. `Absent` means the reply
/// carried no textual payload at all, which is distinct from empty text.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// The payload decoded as JSON.
    Json(serde_json::Value),
    /// The payload was text that is not JSON.
    Text(String),
    /// The reply carried no textual payload.
    Absent,
}

/// Classifies a statement as read or write by its leading keyword.
///
/// # Errors
///
/// Returns [`RouterError::EmptyStatement`] for empty or whitespace-only
/// input.
pub fn classify(sql: &str) -> Result<StatementKind, RouterError> {
    let trimmed = sql.trim_start();
    if trimmed.trim_end().is_empty() {
        return Err(RouterError::EmptyStatement);
    }

    // Prefix match, not token match: "SELECT..." in any case is a read,
    // with no comment stripping or multi-statement awareness.
    if trimmed
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
    {
        Ok(StatementKind::Read)
    } else {
        Ok(StatementKind::Write)
    }
}

/// Executes a statement through the matching tool and normalises the result.
///
/// # Errors
///
/// Returns an error if classification or the tool call fails.
pub async fn execute<T: Transport>(
    session: &mut Session<T>,
    sql: &str,
) -> Result<NormalizedResult, RouterError> {
    let kind = classify(sql)?;
    let tool = match kind {
        StatementKind::Read => Tool::Query,
        StatementKind::Write => Tool::Execute,
    };
    debug!(%tool, "routing statement");

    let result = session
        .call_tool(tool, json!({"sql": sql, "params": []}))
        .await?;

    Ok(normalize(result.text()))
}

/// Executes a statement on the read-only path.
///
/// Rejects any statement that classifies as a write before touching the
/// session, independent of the tool server's own permissions.
///
/// # Errors
///
/// Returns [`RouterError::OperationNotAllowed`] for write statements, plus
/// everything [`execute`] can return.
pub async fn execute_read_only<T: Transport>(
    session: &mut Session<T>,
    sql: &str,
) -> Result<NormalizedResult, RouterError> {
    if classify(sql)? == StatementKind::Write {
        return Err(RouterError::OperationNotAllowed);
    }
    execute(session, sql).await
}

/// Normalises an extracted payload: decoded JSON when possible, raw text
/// otherwise, `Absent` when there was no text.
fn normalize(text: Option<&str>) -> NormalizedResult {
    match text {
        None => NormalizedResult::Absent,
        Some(text) => serde_json::from_str(text)
            .map_or_else(|_| NormalizedResult::Text(text.to_string()), NormalizedResult::Json),
    }
}
