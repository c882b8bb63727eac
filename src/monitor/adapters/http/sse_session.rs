//! HTTP+SSE transport: a long-lived GET stream carries every server message
//! and requests are POSTed to the URL announced in its `endpoint` event.

use super::jsonrpc::{self, JsonRpcChannel, JsonRpcRequest, JsonRpcResponse};
use super::sse::SseReader;
use super::{EVENT_STREAM, ensure_success, is_event_stream};
use crate::monitor::ports::{McpSession, McpSessionError, McpSessionResult};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::ACCEPT;
use serde_json::Value;

const ENDPOINT_EVENT: &str = "endpoint";
const MESSAGE_EVENT: &str = "message";

/// Session over the HTTP+SSE transport.
#[derive(Debug)]
pub(super) struct SseSession {
    client: reqwest::Client,
    post_url: Url,
    stream: SseReader,
    next_id: u64,
}

impl SseSession {
    /// Opens the event stream and waits for the `endpoint` announcement.
    pub(super) async fn open(client: reqwest::Client, url: &str) -> McpSessionResult<Self> {
        let stream_url = Url::parse(url)
            .map_err(|err| McpSessionError::protocol(format!("invalid SSE URL: {err}")))?;
        let response = ensure_success(
            client
                .get(stream_url.clone())
                .header(ACCEPT, EVENT_STREAM)
                .send()
                .await
                .map_err(McpSessionError::connect)?,
        )?;
        if !is_event_stream(&response) {
            return Err(McpSessionError::protocol(
                "SSE endpoint did not answer with an event stream",
            ));
        }

        let mut stream = SseReader::new(response);
        let post_url = loop {
            let Some(event) = stream.next_event().await? else {
                return Err(McpSessionError::protocol(
                    "event stream ended before the endpoint event",
                ));
            };
            if event.event == ENDPOINT_EVENT {
                break stream_url.join(event.data.trim()).map_err(|err| {
                    McpSessionError::protocol(format!("invalid endpoint event: {err}"))
                })?;
            }
        };

        Ok(Self {
            client,
            post_url,
            stream,
            next_id: 1,
        })
    }

    async fn post(&self, message: &JsonRpcRequest<'_>) -> McpSessionResult<()> {
        let response = self
            .client
            .post(self.post_url.clone())
            .json(message)
            .send()
            .await
            .map_err(McpSessionError::connect)?;
        ensure_success(response).map(drop)
    }

    async fn await_response(&mut self, id: u64) -> McpSessionResult<JsonRpcResponse> {
        while let Some(event) = self.stream.next_event().await? {
            if event.event != MESSAGE_EVENT {
                continue;
            }
            let parsed = JsonRpcResponse::parse(event.data.as_bytes())?;
            if let Some(response) = parsed.filter(|message| message.answers(id)) {
                return Ok(response);
            }
        }
        Err(McpSessionError::protocol(
            "event stream ended before the response arrived",
        ))
    }
}

#[async_trait]
impl JsonRpcChannel for SseSession {
    async fn request(&mut self, method: &str, params: Option<Value>) -> McpSessionResult<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.post(&JsonRpcRequest::request(id, method, params)).await?;
        self.await_response(id).await?.into_result()
    }

    async fn notify(&mut self, method: &str) -> McpSessionResult<()> {
        self.post(&JsonRpcRequest::notification(method)).await
    }
}

#[async_trait]
impl McpSession for SseSession {
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
        // Dropping the reader ends the GET stream, which ends the session.
        drop(self);
        Ok(())
    }
}
