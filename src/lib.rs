//! mysql-mcp-client: MCP stdio client for MySQL tool servers
//!
//! This library drives a MySQL tool server — a separate process speaking the
//! Model Context Protocol over stdio — and layers natural-language-to-SQL
//! orchestration on top of it.
//!
//! # Architecture
//!
//! The tool server owns the database connection. This client owns the
//! server:
//!
//! - **Session protocol**: spawn the server process, perform the initialize
//!   handshake, issue tool calls, correlate replies
//! - **Schema introspection**: `list_tables` + `describe_table` into a
//!   normalised schema model
//! - **Translation**: schema-grounded DeepSeek completions parsed into SQL
//! - **Routing**: read/write classification with a read-only guardrail
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Configuration error types
//! - [`mcp`] — MCP protocol implementation (transport, messages, session)
//! - [`schema`] — Schema introspection
//! - [`translate`] — Natural-language-to-SQL translation
//! - [`router`] — Statement classification and routing

pub mod config;
pub mod error;
pub mod mcp;
pub mod router;
pub mod schema;
pub mod translate;
