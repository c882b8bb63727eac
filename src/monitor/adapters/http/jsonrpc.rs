//! JSON-RPC 2.0 framing and the MCP exchanges built on it.

use crate::monitor::ports::{McpSessionError, McpSessionResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// MCP protocol revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Client name reported in `initialize`.
pub const CLIENT_NAME: &str = "vigil";

/// Upper bound on `tools/list` pages followed for one listing.
pub const MAX_TOOL_PAGES: usize = 20;

#[derive(Debug, Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub(super) const fn request(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        }
    }

    pub(super) const fn notification(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    /// Decodes a response, returning `None` for messages that are not
    /// responses (server requests and notifications carry a `method`).
    pub(super) fn parse(payload: &[u8]) -> McpSessionResult<Option<Self>> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|err| McpSessionError::protocol(format!("invalid JSON-RPC payload: {err}")))?;
        if value.get("method").is_some() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| McpSessionError::protocol(format!("invalid JSON-RPC response: {err}")))
    }

    pub(super) fn answers(&self, id: u64) -> bool {
        self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }

    pub(super) fn into_result(self) -> McpSessionResult<Value> {
        if let Some(error) = self.error {
            return Err(McpSessionError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        self.result
            .ok_or_else(|| McpSessionError::protocol("response carries neither result nor error"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: String,
    #[serde(default)]
    capabilities: Value,
}

#[derive(Debug, Deserialize)]
struct ToolEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolsPage {
    tools: Vec<ToolEntry>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// A channel able to carry JSON-RPC requests and notifications to one
/// server.
#[async_trait]
pub(super) trait JsonRpcChannel: Send {
    /// Sends a request and waits for the matching response's result.
    async fn request(&mut self, method: &str, params: Option<Value>) -> McpSessionResult<Value>;

    /// Sends a notification; no response is expected.
    async fn notify(&mut self, method: &str) -> McpSessionResult<()>;
}

/// Runs `initialize` followed by `notifications/initialized`.
pub(super) async fn handshake<C: JsonRpcChannel + ?Sized>(channel: &mut C) -> McpSessionResult<()> {
    let params = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    });
    let raw = channel.request("initialize", Some(params)).await?;
    let initialize: InitializeResult = serde_json::from_value(raw)
        .map_err(|err| McpSessionError::protocol(format!("invalid initialize result: {err}")))?;
    if initialize.protocol_version.trim().is_empty() {
        return Err(McpSessionError::protocol(
            "initialize result has an empty protocol version",
        ));
    }
    if !initialize.capabilities.is_null() && !initialize.capabilities.is_object() {
        return Err(McpSessionError::protocol(
            "initialize result capabilities must be an object",
        ));
    }
    channel.notify("notifications/initialized").await
}

/// Sends `ping` and discards the (empty) result.
pub(super) async fn ping<C: JsonRpcChannel + ?Sized>(channel: &mut C) -> McpSessionResult<()> {
    channel.request("ping", None).await.map(drop)
}

/// Collects tool names across `tools/list` pages.
pub(super) async fn list_tools<C: JsonRpcChannel + ?Sized>(
    channel: &mut C,
) -> McpSessionResult<Vec<String>> {
    let mut names = Vec::new();
    let mut cursor: Option<String> = None;
    for _ in 0..MAX_TOOL_PAGES {
        let params = cursor.take().map(|next| json!({ "cursor": next }));
        let raw = channel.request("tools/list", params).await?;
        let page: ToolsPage = serde_json::from_value(raw)
            .map_err(|err| McpSessionError::protocol(format!("invalid tools/list result: {err}")))?;
        names.extend(page.tools.into_iter().map(|tool| tool.name));
        match page.next_cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => return Ok(names),
        }
    }
    Ok(names)
}
