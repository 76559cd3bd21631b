//! stdio transport for the MCP client.
//!
//! This module owns the tool-server child process and implements the stdio
//! transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin of the child: receives messages from this client
//! - stdout of the child: sends messages back
//! - stderr of the child: may be used for logging (not MCP messages)
//!
//! # Resource Ownership
//!
//! A [`StdioTransport`] exclusively owns its child process and pipes. They
//! are released on [`StdioTransport::close`], and a `Drop` backstop kills
//! the child on any path where `close` was never reached.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

/// How long `close` waits for the child to exit after stdin is closed
/// before killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Errors that can occur at the transport layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The tool-server executable could not be started.
    #[error("failed to spawn tool server `{command}`")]
    Spawn {
        /// The command that failed to start.
        command: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the child's pipes failed.
    #[error("tool server I/O failed")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The child exited (or closed its stdout) before a message arrived.
    #[error("tool server closed the connection before replying")]
    Eof,

    /// A line arrived that is not decodable JSON.
    #[error("tool server sent an undecodable message")]
    Malformed {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The transport was used after `close`.
    #[error("transport is closed")]
    Closed,
}

/// An ordered, reliable JSON message stream to a tool server.
///
/// The trait exists so the session state machine can be exercised against a
/// scripted in-memory transport; [`StdioTransport`] is the production
/// implementation.
#[async_trait]
pub trait Transport: Send {
    /// Sends one complete JSON message.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipe is closed or the process has exited.
    async fn send(&mut self, message: &Value) -> Result<(), TransportError>;

    /// Blocks until the next complete JSON message is available.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Eof`] if the peer exits before a message
    /// arrives and [`TransportError::Malformed`] on undecodable input.
    async fn receive(&mut self) -> Result<Value, TransportError>;

    /// Requests graceful shutdown, then terminates the peer if it does not
    /// comply within a bounded grace period. Idempotent.
    async fn close(&mut self);
}

/// A stdio transport backed by a spawned child process.
pub struct StdioTransport {
    /// The child process, present until `close` takes it.
    child: Option<Child>,
    /// Write end of the child's stdin, present until `close`.
    writer: Option<ChildStdin>,
    /// Buffered read end of the child's stdout, present until `close`.
    reader: Option<BufReader<ChildStdout>>,
    /// Command name kept for diagnostics.
    command: String,
}

impl StdioTransport {
    /// Spawns `command args...` with the given environment variables added
    /// and pipes wired for MCP stdio framing.
    ///
    /// The child's stderr is inherited so its own logging stays visible.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Spawn`] if the executable cannot be started.
    pub fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, TransportError> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::Spawn {
                command: command.to_string(),
                source: e,
            })?;

        // Stdio::piped guarantees both handles are present on a fresh child.
        let writer = child.stdin.take().ok_or_else(|| TransportError::Io {
            source: std::io::Error::other("child stdin not captured"),
        })?;
        let reader = child.stdout.take().ok_or_else(|| TransportError::Io {
            source: std::io::Error::other("child stdout not captured"),
        })?;

        debug!(command, pid = ?child.id(), "spawned tool server");

        Ok(Self {
            child: Some(child),
            writer: Some(writer),
            reader: Some(BufReader::new(reader)),
            command: command.to_string(),
        })
    }

    /// Reads the next non-blank line from the child's stdout.
    async fn read_line(&mut self) -> Result<String, TransportError> {
        let reader = self.reader.as_mut().ok_or(TransportError::Closed)?;

        loop {
            let mut line = String::new();
            let bytes_read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| TransportError::Io { source: e })?;

            if bytes_read == 0 {
                return Err(TransportError::Eof);
            }

            // Remove the trailing newline
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }

            if !line.trim().is_empty() {
                return Ok(line);
            }
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&mut self, message: &Value) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::Closed)?;

        let json = serde_json::to_string(message)
            .map_err(|e| TransportError::Malformed { source: e })?;

        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| TransportError::Io { source: e })?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| TransportError::Io { source: e })?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::Io { source: e })?;

        Ok(())
    }

    async fn receive(&mut self) -> Result<Value, TransportError> {
        let line = self.read_line().await?;
        serde_json::from_str(&line).map_err(|e| TransportError::Malformed { source: e })
    }

    async fn close(&mut self) {
        // Dropping stdin is the graceful shutdown request: the server sees
        // EOF on its input and is expected to exit.
        drop(self.writer.take());
        self.reader = None;

        let Some(mut child) = self.child.take() else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(command = %self.command, %status, "tool server exited");
            }
            Ok(Err(e)) => {
                warn!(command = %self.command, error = %e, "failed to reap tool server");
            }
            Err(_) => {
                warn!(
                    command = %self.command,
                    grace_secs = SHUTDOWN_GRACE.as_secs(),
                    "tool server did not exit within grace period, killing"
                );
                if let Err(e) = child.kill().await {
                    warn!(command = %self.command, error = %e, "failed to kill tool server");
                }
            }
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        // kill_on_drop covers the child itself; this only logs the leak.
        if let Some(child) = &self.child {
            warn!(
                command = %self.command,
                pid = ?child.id(),
                "transport dropped without close, killing tool server"
            );
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_nonexistent_command_fails() {
        let result = StdioTransport::spawn(
            "definitely-not-a-real-executable-4a7f",
            &[],
            &HashMap::new(),
        );
        assert!(matches!(result, Err(TransportError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_server_round_trip() {
        // `cat` echoes our frames back verbatim, which is enough to exercise
        // framing in both directions.
        let mut transport = StdioTransport::spawn("cat", &[], &HashMap::new()).unwrap();

        let message = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
        transport.send(&message).await.unwrap();

        let received = transport.receive().await.unwrap();
        assert_eq!(received, message);

        transport.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn eof_when_child_exits() {
        let mut transport =
            StdioTransport::spawn("true", &[], &HashMap::new()).unwrap();

        let result = transport.receive().await;
        assert!(matches!(result, Err(TransportError::Eof)));

        transport.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn malformed_line_is_rejected() {
        let mut transport = StdioTransport::spawn(
            "sh",
            &["-c".to_string(), "echo not-json".to_string()],
            &HashMap::new(),
        )
        .unwrap();

        let result = transport.receive().await;
        assert!(matches!(result, Err(TransportError::Malformed { .. })));

        transport.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn close_is_idempotent() {
        let mut transport = StdioTransport::spawn("cat", &[], &HashMap::new()).unwrap();
        transport.close().await;
        transport.close().await;

        let result = transport.receive().await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
