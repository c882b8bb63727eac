//! Streamable HTTP transport: every message is a POST to the endpoint URL.

use super::jsonrpc::{self, JsonRpcChannel, JsonRpcRequest, JsonRpcResponse};
use super::sse::SseReader;
use super::{SESSION_HEADER, ensure_success, is_event_stream, read_bounded_body};
use crate::monitor::ports::{McpSession, McpSessionError, McpSessionResult};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Session over the streamable HTTP transport.
#[derive(Debug)]
pub(super) struct StreamableSession {
    client: reqwest::Client,
    url: String,
    session_id: Option<String>,
    next_id: u64,
}

impl StreamableSession {
    pub(super) const fn new(client: reqwest::Client, url: String) -> Self {
        Self {
            client,
            url,
            session_id: None,
            next_id: 1,
        }
    }

    async fn post(&mut self, message: &JsonRpcRequest<'_>) -> McpSessionResult<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.url)
            .header(ACCEPT, ACCEPT_BOTH)
            .json(message);
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_HEADER, session_id);
        }
        let response = ensure_success(request.send().await.map_err(McpSessionError::connect)?)?;
        if let Some(assigned) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.session_id = Some(assigned.to_owned());
        }
        Ok(response)
    }

    async fn read_response(response: reqwest::Response, id: u64) -> McpSessionResult<JsonRpcResponse> {
        if is_event_stream(&response) {
            let mut reader = SseReader::new(response);
            while let Some(event) = reader.next_event().await? {
                let parsed = JsonRpcResponse::parse(event.data.as_bytes())?;
                if let Some(response_message) = parsed.filter(|message| message.answers(id)) {
                    return Ok(response_message);
                }
            }
            return Err(McpSessionError::protocol(
                "event stream ended before the response arrived",
            ));
        }

        let body = read_bounded_body(response).await?;
        let parsed = JsonRpcResponse::parse(&body)?
            .ok_or_else(|| McpSessionError::protocol("expected a JSON-RPC response"))?;
        if parsed.answers(id) {
            Ok(parsed)
        } else {
            Err(McpSessionError::protocol("response id does not match request"))
        }
    }
}

#[async_trait]
impl JsonRpcChannel for StreamableSession {
    async fn request(&mut self, method: &str, params: Option<Value>) -> McpSessionResult<Value> {
        let id = self.next_id;
        self.next_id += 1;
        let response = self.post(&JsonRpcRequest::request(id, method, params)).await?;
        Self::read_response(response, id).await?.into_result()
    }

    async fn notify(&mut self, method: &str) -> McpSessionResult<()> {
        self.post(&JsonRpcRequest::notification(method)).await.map(drop)
    }
}

#[async_trait]
impl McpSession for StreamableSession {
    async fn initialize(&mut self) -> McpSessionResult<()> {
        jsonrpc::handshake(self).await
    }

    async fn ping(&mut self) -> McpSessionResult<()> {
        jsonrpc::ping(self).await
    }

    async fn list_tools(&mut self) -> McpSessionResult<Vec<String>> {
        jsonrpc::list_tools(self).await
    }

    async fn close(self: Box<Self>) -> McpSessionResult<()> {
        let Some(session_id) = self.session_id else {
            return Ok(());
        };
        let response = self
            .client
            .delete(&self.url)
            .header(SESSION_HEADER, session_id)
            .send()
            .await
            .map_err(McpSessionError::connect)?;
        // 405 means the server does not support explicit termination.
        if response.status().as_u16() == 405 {
            return Ok(());
        }
        ensure_success(response).map(drop)
    }
}
