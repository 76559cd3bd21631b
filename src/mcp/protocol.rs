//! JSON-RPC 2.0 message types for the MCP client.
//!
//! This module defines the messages the client exchanges with a tool server.
//! All messages follow the JSON-RPC 2.0 specification with MCP-specific
//! extensions.
//!
//! # Message Types
//!
//! - **Request**: an outgoing message expecting a reply (has `id`)
//! - **Reply**: the server's answer to a request (result or error)
//! - **Notification**: an outgoing one-way message (no `id`, no reply)
//!
//! # MCP-Specific Constraints
//!
//! - Request IDs must be strings or integers (never `null`)
//! - Request IDs must be unique within a session

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Client name sent during capability negotiation.
pub const CLIENT_NAME: &str = "mysql-mcp-client";

/// A JSON-RPC 2.0 request ID.
///
/// Per the MCP specification, IDs must be strings or integers, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// An outgoing JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new outgoing request.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// An outgoing JSON-RPC 2.0 notification (client to server).
///
/// Used for the `notifications/initialized` handshake completion message.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }

    /// Creates the `notifications/initialized` handshake notification.
    #[must_use]
    pub fn initialized() -> Self {
        Self::new("notifications/initialized", None)
    }
}

/// A JSON-RPC 2.0 error object carried in a reply.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i64,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default)]
    pub data: Option<Value>,
}

/// An incoming JSON-RPC 2.0 reply (success or error).
///
/// Exactly one of `result` and `error` is present in a well-formed reply;
/// the session layer decides what a reply with neither (or both) means.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcReply {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// The request ID this reply corresponds to.
    ///
    /// Error replies to undecodable requests may carry no ID.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// The result of the method call, on success.
    #[serde(default)]
    pub result: Option<Value>,

    /// The error details, on failure.
    #[serde(default)]
    pub error: Option<JsonRpcErrorData>,
}

/// Parameters sent with the `initialize` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version this client speaks.
    pub protocol_version: &'static str,
    /// Client capabilities (none beyond the baseline).
    pub capabilities: Value,
    /// Client identification.
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION,
            capabilities: serde_json::json!({}),
            client_info: ClientInfo::default(),
        }
    }
}

/// Client information sent during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: &'static str,
    /// Client version.
    pub version: &'static str,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: CLIENT_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// The `initialize` reply payload the server sends back.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version the server settled on.
    pub protocol_version: String,
    /// Server identification, if provided.
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

/// Server information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    #[serde(default)]
    pub version: Option<String>,
}

/// The tools the server is known to expose.
///
/// Tool names are fixed by the server's contract; the enum keeps call sites
/// from passing free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Establish (or replace) the database connection.
    ConnectDb,
    /// Run a read statement, returning rows as JSON text.
    Query,
    /// Run a write statement, returning affected-row metadata as JSON text.
    Execute,
    /// List the tables of the connected database.
    ListTables,
    /// Describe the columns of one table.
    DescribeTable,
}

impl Tool {
    /// Returns the wire name of this tool.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ConnectDb => "connect_db",
            Self::Query => "query",
            Self::Execute => "execute",
            Self::ListTables => "list_tables",
            Self::DescribeTable => "describe_table",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters for a `tools/call` request.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: &'static str,
    /// Arguments for the tool.
    pub arguments: Value,
}

/// Content item in a tool call result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Content of a kind this client does not interpret.
    #[serde(other)]
    Unknown,
}

/// Result of a tool call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    #[serde(default)]
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Returns the first textual content item, if any.
    ///
    /// An absent text item is distinct from an empty string: the former means
    /// the server sent no textual payload at all.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|item| match item {
            ToolContent::Text { text } => Some(text.as_str()),
            ToolContent::Unknown => None,
        })
    }
}
