//! MCP connector speaking JSON-RPC over HTTP.
//!
//! Both MCP HTTP transports are supported: streamable HTTP, where each
//! message is a POST answered in its own response, and the older HTTP+SSE
//! variant, where a long-lived event stream carries every server message.
//! Redirects are never followed so that a 3xx answer surfaces as a status.

mod jsonrpc;
mod sse;
mod sse_session;
mod streamable;

use crate::monitor::domain::{Endpoint, TransportKind};
use crate::monitor::ports::{McpConnector, McpSession, McpSessionError, McpSessionResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use sse_session::SseSession;
use streamable::StreamableSession;

pub use jsonrpc::{CLIENT_NAME, MAX_TOOL_PAGES, PROTOCOL_VERSION};

/// Largest response body, or single server-sent event, a session buffers.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

const EVENT_STREAM: &str = "text/event-stream";
const SESSION_HEADER: &str = "mcp-session-id";

/// Connector that opens MCP sessions over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMcpConnector {
    client: reqwest::Client,
}

impl HttpMcpConnector {
    /// Creates a connector with a client that does not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns the client construction error when the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Creates a connector around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl McpConnector for HttpMcpConnector {
    async fn connect(&self, endpoint: &Endpoint) -> McpSessionResult<Box<dyn McpSession>> {
        match endpoint.transport() {
            TransportKind::StreamableHttp => Ok(Box::new(StreamableSession::new(
                self.client.clone(),
                endpoint.url().to_owned(),
            ))),
            TransportKind::Sse => Ok(Box::new(
                SseSession::open(self.client.clone(), endpoint.url()).await?,
            )),
        }
    }
}

/// Maps a non-success HTTP status to its session error.
fn ensure_success(response: reqwest::Response) -> McpSessionResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(McpSessionError::from_status(status.as_u16()))
    }
}

fn body_too_large() -> McpSessionError {
    McpSessionError::protocol(format!("response body exceeds {MAX_BODY_BYTES} bytes"))
}

/// Reads a whole response body, refusing anything above [`MAX_BODY_BYTES`].
async fn read_bounded_body(mut response: reqwest::Response) -> McpSessionResult<Vec<u8>> {
    let declared = response
        .content_length()
        .and_then(|length| usize::try_from(length).ok());
    if declared.is_some_and(|length| length > MAX_BODY_BYTES) {
        return Err(body_too_large());
    }

    let mut body = Vec::with_capacity(declared.unwrap_or_default());
    while let Some(chunk) = response.chunk().await.map_err(McpSessionError::connect)? {
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(body_too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with(EVENT_STREAM))
}
