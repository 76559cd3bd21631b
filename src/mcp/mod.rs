//! Model Context Protocol (MCP) client implementation.
//!
//! This module implements the client side of the MCP specification for
//! driving a MySQL tool server over stdio transport using JSON-RPC 2.0
//! messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Client                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │   Session   │───▶│  Transport  │───▶│ tool server │    │
//! │   │ (lifecycle) │    │   (stdio)   │    │   (child)   │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                               │
//! │          ▼                  ▼                               │
//! │   ┌─────────────────────────────────────────────────┐      │
//! │   │              JSON-RPC Messages                  │      │
//! │   └─────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{ClientError, Session, SessionOptions, SessionState};
pub use protocol::{Tool, ToolCallResult, ToolContent, MCP_PROTOCOL_VERSION};
pub use transport::{StdioTransport, Transport, TransportError};
