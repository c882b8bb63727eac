//! MCP session port used by the prober's handshake, ping, and listing stages.

use crate::monitor::domain::Endpoint;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for MCP session operations.
pub type McpSessionResult<T> = Result<T, McpSessionError>;

/// Opens MCP sessions against remote endpoints.
#[async_trait]
pub trait McpConnector: Send + Sync {
    /// Opens the transport to the endpoint.
    ///
    /// The returned session must complete [`McpSession::initialize`] before
    /// any other request. It must be closed even when that handshake fails or
    /// is abandoned, since the server may already have assigned it state.
    ///
    /// # Errors
    ///
    /// Returns [`McpSessionError`] when the transport cannot be opened.
    async fn connect(&self, endpoint: &Endpoint) -> McpSessionResult<Box<dyn McpSession>>;
}

/// An MCP session over an open transport.
#[async_trait]
pub trait McpSession: Send {
    /// Performs the `initialize` handshake and sends
    /// `notifications/initialized`.
    ///
    /// # Errors
    ///
    /// Returns [`McpSessionError`] describing why the handshake failed.
    async fn initialize(&mut self) -> McpSessionResult<()>;

    /// Sends a `ping` request and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`McpSessionError`] when the request fails or the server
    /// answers with a JSON-RPC error.
    async fn ping(&mut self) -> McpSessionResult<()>;

    /// Lists the names of every advertised tool, following pagination.
    ///
    /// # Errors
    ///
    /// Returns [`McpSessionError`] when any page fails.
    async fn list_tools(&mut self) -> McpSessionResult<Vec<String>>;

    /// Terminates the session and releases its transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpSessionError`] when the server rejects termination. The
    /// transport is released regardless.
    async fn close(self: Box<Self>) -> McpSessionResult<()>;
}

/// Errors returned by MCP session adapters.
#[derive(Debug, Clone, Error)]
pub enum McpSessionError {
    /// The endpoint could not be reached (refused, DNS, reset).
    #[error("connection failed: {0}")]
    Connect(Arc<dyn std::error::Error + Send + Sync>),

    /// The endpoint rejected the request with 401 or 403.
    #[error("authorization required (HTTP {0})")]
    Unauthorized(u16),

    /// The endpoint answered with a server fault.
    #[error("server error (HTTP {0})")]
    ServerFault(u16),

    /// The endpoint answered with a status that is neither success, auth, nor
    /// server fault.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// The response violated the MCP or JSON-RPC contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message reported by the server.
        message: String,
    },
}

impl McpSessionError {
    /// Wraps a connectivity error.
    pub fn connect(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connect(Arc::new(err))
    }

    /// Creates a protocol error from a description.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Classifies a non-success HTTP status.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(status),
            500..=599 => Self::ServerFault(status),
            _ => Self::UnexpectedStatus(status),
        }
    }
}
