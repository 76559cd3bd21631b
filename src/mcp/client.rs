//! MCP session client for the MySQL tool server.
//!
//! This module implements the client side of the MCP lifecycle:
//!
//! 1. **Initialisation**: capability negotiation and version agreement
//! 2. **Operation**: issuing tool calls and correlating their replies
//! 3. **Shutdown**: graceful connection termination
//!
//! # Concurrency Model
//!
//! The transport is a single ordered byte stream with no multiplexing, so a
//! session admits at most one outstanding request. A second `call_tool`
//! while one is in flight fails fast with [`ClientError::ConcurrentCall`]
//! instead of silently interleaving. A call that times out never resolves,
//! which leaves its request outstanding: every later call on that session
//! fails the same way, and the session should be dropped and recreated.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConnectionParams, ServerConfig};
use crate::mcp::protocol::{
    InitializeParams, InitializeResult, JsonRpcReply, JsonRpcRequest, OutgoingNotification,
    RequestId, Tool, ToolCallParams, ToolCallResult,
};
use crate::mcp::transport::{StdioTransport, Transport, TransportError};

/// Errors that can occur at the session layer.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The initialize handshake was rejected or could not complete.
    #[error("handshake failed: {reason}")]
    Handshake {
        /// What went wrong.
        reason: String,
    },

    /// A tool call was issued before the handshake completed.
    #[error("session is not initialised")]
    NotInitialised,

    /// The session was used after `close`.
    #[error("session is closed")]
    Closed,

    /// A tool call was issued while another was still outstanding.
    #[error("a tool call is already in flight on this session")]
    ConcurrentCall,

    /// The server reported that the tool failed.
    #[error("tool `{tool}` failed: {message}")]
    Tool {
        /// The tool that failed.
        tool: &'static str,
        /// JSON-RPC error code, when the failure came as a protocol error.
        code: Option<i64>,
        /// The failure description from the server.
        message: String,
    },

    /// No reply arrived within the configured deadline.
    #[error("no reply from tool `{tool}` within {timeout:?}")]
    Timeout {
        /// The tool that was called.
        tool: &'static str,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The underlying transport failed.
    #[error("transport failure")]
    Transport(#[from] TransportError),

    /// The server answered with something other than the reply we are owed.
    #[error("protocol violation: {detail}")]
    Protocol {
        /// What the server got wrong.
        detail: String,
    },
}

/// Session state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport is up, handshake not yet performed.
    Connected,
    /// Handshake complete, tool calls allowed.
    Ready,
    /// Closed; no further use permitted.
    Closed,
}

/// Tunable session parameters.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Deadline for each tool call's reply.
    pub call_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// One live connection to the tool server: one child process, one handshake.
///
/// A session is owned by the caller that created it and is never shared.
/// Lifecycle: spawn → [`Session::initialize`] → zero or more
/// [`Session::call_tool`] → [`Session::close`].
pub struct Session<T: Transport> {
    transport: T,
    state: SessionState,
    /// Next request ID; IDs must be unique within a session.
    next_id: i64,
    /// Whether a request has been sent whose reply was never consumed.
    in_flight: bool,
    call_timeout: Duration,
}

impl Session<StdioTransport> {
    /// Spawns the tool-server process and wraps it in a fresh session.
    ///
    /// Connection parameters travel as `MYSQL_*` environment variables, per
    /// the server's spawn contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the server executable cannot be started.
    pub fn spawn(
        server: &ServerConfig,
        conn: &ConnectionParams,
        options: SessionOptions,
    ) -> Result<Self, ClientError> {
        let transport = StdioTransport::spawn(&server.command, &server.args, &conn.env())?;
        Ok(Self::with_transport(transport, options))
    }
}

impl<T: Transport> Session<T> {
    /// Wraps an already-open transport in a fresh session.
    #[must_use]
    pub fn with_transport(transport: T, options: SessionOptions) -> Self {
        Self {
            transport,
            state: SessionState::Connected,
            next_id: 1,
            in_flight: false,
            call_timeout: options.call_timeout,
        }
    }

    /// Returns the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    fn next_request_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        RequestId::Number(id)
    }

    /// Performs the initialize handshake.
    ///
    /// Sends `initialize`, validates the reply, then confirms with the
    /// `notifications/initialized` notification. Must be called exactly once
    /// per session before any tool call.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Handshake`] if the server rejects the
    /// handshake, replies out of order, or the transport fails.
    pub async fn initialize(&mut self) -> Result<(), ClientError> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Ready => {
                return Err(ClientError::Handshake {
                    reason: "session already initialised".to_string(),
                })
            }
            SessionState::Closed => return Err(ClientError::Closed),
        }

        let id = self.next_request_id();
        let params = serde_json::to_value(InitializeParams::default()).map_err(|e| {
            ClientError::Handshake {
                reason: format!("could not encode initialize params: {e}"),
            }
        })?;
        let request = JsonRpcRequest::new(id.clone(), "initialize", Some(params));

        let reply = self
            .round_trip(&request, "initialize")
            .await
            .map_err(|e| ClientError::Handshake {
                reason: e.to_string(),
            })?;

        if let Some(error) = reply.error {
            return Err(ClientError::Handshake {
                reason: format!("server rejected initialize (code {}): {}", error.code, error.message),
            });
        }
        if reply.id.as_ref() != Some(&id) {
            return Err(ClientError::Handshake {
                reason: "initialize reply does not match request ID".to_string(),
            });
        }

        let result: InitializeResult = reply
            .result
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ClientError::Handshake {
                reason: format!("malformed initialize result: {e}"),
            })?
            .ok_or_else(|| ClientError::Handshake {
                reason: "initialize reply carries no result".to_string(),
            })?;

        info!(
            protocol_version = %result.protocol_version,
            server = result.server_info.as_ref().map_or("<unnamed>", |s| s.name.as_str()),
            "handshake complete"
        );

        let notification = OutgoingNotification::initialized();
        let message = serde_json::to_value(&notification).map_err(|e| ClientError::Handshake {
            reason: format!("could not encode initialized notification: {e}"),
        })?;
        self.transport
            .send(&message)
            .await
            .map_err(|e| ClientError::Handshake {
                reason: format!("could not confirm handshake: {e}"),
            })?;

        self.state = SessionState::Ready;
        Ok(())
    }

    /// Calls one tool and returns its result.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotInitialised`] before the handshake,
    ///   [`ClientError::Closed`] after `close`
    /// - [`ClientError::ConcurrentCall`] while a previous call is outstanding
    /// - [`ClientError::Timeout`] if no reply arrives within the deadline;
    ///   the session stays deterministically unusable afterwards
    /// - [`ClientError::Tool`] if the server reports failure
    /// - [`ClientError::Transport`] / [`ClientError::Protocol`] on transport
    ///   or correlation failures
    pub async fn call_tool(
        &mut self,
        tool: Tool,
        arguments: Value,
    ) -> Result<ToolCallResult, ClientError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Connected => return Err(ClientError::NotInitialised),
            SessionState::Closed => return Err(ClientError::Closed),
        }
        if self.in_flight {
            return Err(ClientError::ConcurrentCall);
        }

        let id = self.next_request_id();
        let params = ToolCallParams {
            name: tool.name(),
            arguments,
        };
        let request = JsonRpcRequest::new(
            id.clone(),
            "tools/call",
            Some(serde_json::to_value(&params).map_err(|e| ClientError::Protocol {
                detail: format!("could not encode tool call params: {e}"),
            })?),
        );

        debug!(tool = %tool, id = %id, "calling tool");

        let message = serde_json::to_value(&request).map_err(|e| ClientError::Protocol {
            detail: format!("could not encode request: {e}"),
        })?;
        self.transport.send(&message).await?;

        // From here the reply is owed to us; it stays owed if we time out.
        self.in_flight = true;

        let reply = match tokio::time::timeout(self.call_timeout, self.transport.receive()).await
        {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                self.in_flight = false;
                return Err(e.into());
            }
            Err(_) => {
                warn!(tool = %tool, timeout = ?self.call_timeout, "tool call timed out");
                return Err(ClientError::Timeout {
                    tool: tool.name(),
                    timeout: self.call_timeout,
                });
            }
        };
        self.in_flight = false;

        let reply: JsonRpcReply =
            serde_json::from_value(reply).map_err(|e| ClientError::Protocol {
                detail: format!("undecodable reply to tool `{tool}`: {e}"),
            })?;

        if reply.id.as_ref() != Some(&id) {
            return Err(ClientError::Protocol {
                detail: format!(
                    "reply correlation violated: expected ID {id}, got {}",
                    reply.id.map_or_else(|| "<none>".to_string(), |i| i.to_string())
                ),
            });
        }

        if let Some(error) = reply.error {
            return Err(ClientError::Tool {
                tool: tool.name(),
                code: Some(error.code),
                message: error.message,
            });
        }

        let result: ToolCallResult = reply
            .result
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ClientError::Protocol {
                detail: format!("malformed result for tool `{tool}`: {e}"),
            })?
            .ok_or_else(|| ClientError::Protocol {
                detail: format!("reply to tool `{tool}` carries neither result nor error"),
            })?;

        if result.is_error {
            return Err(ClientError::Tool {
                tool: tool.name(),
                code: None,
                message: result
                    .text()
                    .map_or_else(|| "tool reported failure".to_string(), str::to_string),
            });
        }

        Ok(result)
    }

    /// Connects the server to the database, replacing any prior connection.
    ///
    /// # Errors
    ///
    /// Propagates [`Session::call_tool`] failures.
    pub async fn connect_db(
        &mut self,
        conn: &ConnectionParams,
    ) -> Result<ToolCallResult, ClientError> {
        self.call_tool(
            Tool::ConnectDb,
            json!({
                "host": conn.host,
                "user": conn.user,
                "password": conn.password,
                "database": conn.database,
                "port": conn.port,
            }),
        )
        .await
    }

    /// Closes the session, terminating the tool server. Idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.transport.close().await;
        self.state = SessionState::Closed;
        debug!("session closed");
    }

    async fn round_trip(
        &mut self,
        request: &JsonRpcRequest,
        what: &str,
    ) -> Result<JsonRpcReply, ClientError> {
        let message = serde_json::to_value(request).map_err(|e| ClientError::Protocol {
            detail: format!("could not encode {what} request: {e}"),
        })?;
        self.transport.send(&message).await?;

        let value = tokio::time::timeout(self.call_timeout, self.transport.receive())
            .await
            .map_err(|_| ClientError::Timeout {
                tool: "initialize",
                timeout: self.call_timeout,
            })??;

        serde_json::from_value(value).map_err(|e| ClientError::Protocol {
            detail: format!("undecodable {what} reply: {e}"),
        })
    }
}
