//! Streamable HTTP probes against the loopback server.

use super::loopback::{LoopbackServer, RecordedRequest, Reply};
use eyre::Result;
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use vigil::monitor::adapters::HttpMcpConnector;
use vigil::monitor::adapters::http::{CLIENT_NAME, MAX_BODY_BYTES, PROTOCOL_VERSION};
use vigil::monitor::domain::{AuthStatus, CheckResult, Endpoint, HealthStatus, TransportKind};
use vigil::monitor::ports::EndpointProber;
use vigil::monitor::services::{McpProber, ProbeTimeouts};

const SESSION_ID: &str = "session-42";

fn rpc_result(request: &RecordedRequest, result: &Value) -> Value {
    json!({"jsonrpc": "2.0", "id": request.rpc_id(), "result": result})
}

fn mcp_server(request: &RecordedRequest) -> Reply {
    if request.method == "DELETE" {
        return Reply::status(200);
    }
    match request.rpc_method().as_deref() {
        Some("initialize") => Reply::json(&rpc_result(
            request,
            &json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "loopback", "version": "1.0.0"}
            }),
        ))
        .with_header("Mcp-Session-Id", SESSION_ID),
        Some("notifications/initialized") => Reply::status(202),
        Some("ping") => Reply::json(&rpc_result(request, &json!({}))),
        Some("tools/list") => {
            let cursor = request
                .json()
                .pointer("/params/cursor")
                .and_then(Value::as_str)
                .map(str::to_owned);
            match cursor.as_deref() {
                None => Reply::json(&rpc_result(
                    request,
                    &json!({"tools": [{"name": "search"}, {"name": "fetch"}], "nextCursor": "page-2"}),
                )),
                Some(_) => Reply::event_stream(&rpc_result(
                    request,
                    &json!({"tools": [{"name": "summarize"}]}),
                )),
            }
        }
        _ => Reply::json(&json!({
            "jsonrpc": "2.0",
            "id": request.rpc_id(),
            "error": {"code": -32601, "message": "method not found"}
        })),
    }
}

async fn probe(url: &str) -> Result<CheckResult> {
    probe_within(url, ProbeTimeouts::default()).await
}

async fn probe_within(url: &str, timeouts: ProbeTimeouts) -> Result<CheckResult> {
    let prober = McpProber::new(
        Arc::new(HttpMcpConnector::new()?),
        Arc::new(DefaultClock),
        timeouts,
    );
    let endpoint = Endpoint::new(url, TransportKind::StreamableHttp)?;
    Ok(prober.probe(&endpoint).await)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn full_session_is_healthy_and_paginates_tools() -> Result<()> {
    let server = LoopbackServer::start(mcp_server).await?;

    let result = probe(&server.url("/mcp")).await?;

    assert_eq!(result.health(), HealthStatus::Healthy);
    assert_eq!(result.auth(), AuthStatus::Open);
    assert_eq!(result.tool_count(), Some(3));
    assert!(result.latency_ms().is_some());
    assert_eq!(result.error(), None);

    let requests = server.requests();
    let methods: Vec<String> = requests
        .iter()
        .map(|request| request.rpc_method().unwrap_or_else(|| request.method.clone()))
        .collect();
    assert_eq!(
        methods,
        vec![
            "initialize",
            "notifications/initialized",
            "ping",
            "tools/list",
            "tools/list",
            "DELETE",
        ]
    );

    let initialize = requests.first().ok_or_else(|| eyre::eyre!("no requests"))?;
    let params = initialize.json();
    assert_eq!(params.pointer("/params/protocolVersion"), Some(&json!(PROTOCOL_VERSION)));
    assert_eq!(params.pointer("/params/clientInfo/name"), Some(&json!(CLIENT_NAME)));
    assert_eq!(initialize.header("mcp-session-id"), None);
    assert!(
        requests
            .iter()
            .skip(1)
            .all(|request| request.header("mcp-session-id") == Some(SESSION_ID))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_server_is_healthy_and_protected() -> Result<()> {
    let server = LoopbackServer::start(|_: &RecordedRequest| Reply::status(401)).await?;

    let result = probe(&server.url("/mcp")).await?;

    assert_eq!(result.health(), HealthStatus::Healthy);
    assert_eq!(result.auth(), AuthStatus::Protected);
    assert_eq!(result.latency_ms(), None);
    assert_eq!(result.error(), None);
    assert_eq!(server.requests().len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn server_fault_is_down() -> Result<()> {
    let server = LoopbackServer::start(|_: &RecordedRequest| Reply::status(503)).await?;

    let result = probe(&server.url("/mcp")).await?;

    assert_eq!(result.health(), HealthStatus::Down);
    assert_eq!(result.auth(), AuthStatus::Unknown);
    assert!(result.error().is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_is_unhealthy() -> Result<()> {
    let server =
        LoopbackServer::start(|_: &RecordedRequest| Reply::raw("<html>not mcp</html>")).await?;

    let result = probe(&server.url("/mcp")).await?;

    assert_eq!(result.health(), HealthStatus::Unhealthy);
    assert_eq!(result.auth(), AuthStatus::Open);
    assert!(result.error().is_some_and(|text| text.contains("invalid JSON-RPC payload")));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_error_keeps_latency() -> Result<()> {
    let server = LoopbackServer::start(|request: &RecordedRequest| {
        if request.rpc_method().as_deref() == Some("tools/list") {
            return Reply::json(&json!({
                "jsonrpc": "2.0",
                "id": request.rpc_id(),
                "error": {"code": -32603, "message": "registry offline"}
            }));
        }
        mcp_server(request)
    })
    .await?;

    let result = probe(&server.url("/mcp")).await?;

    assert_eq!(result.health(), HealthStatus::Unhealthy);
    assert!(result.latency_ms().is_some());
    assert_eq!(result.tool_count(), None);
    assert!(result.error().is_some_and(|text| text.contains("registry offline")));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_connection_is_down() -> Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/mcp", listener.local_addr()?);
    drop(listener);

    let result = probe(&url).await?;

    assert_eq!(result.health(), HealthStatus::Down);
    assert_eq!(result.auth(), AuthStatus::Unknown);
    assert_eq!(result.latency_ms(), None);
    assert_eq!(result.tool_count(), None);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stalled_handshake_still_terminates_the_session() -> Result<()> {
    let server = LoopbackServer::start(|request: &RecordedRequest| {
        if request.rpc_method().as_deref() == Some("notifications/initialized") {
            return Reply::stalled();
        }
        mcp_server(request)
    })
    .await?;
    let timeouts = ProbeTimeouts::new(Duration::from_millis(300), Duration::from_secs(2));

    let result = probe_within(&server.url("/mcp"), timeouts).await?;

    assert_eq!(result.health(), HealthStatus::Down);
    assert_eq!(result.error(), Some("probe timed out after 300ms"));
    let requests = server.requests();
    let delete = requests
        .iter()
        .find(|request| request.method == "DELETE")
        .ok_or_else(|| eyre::eyre!("half-open session was not terminated"))?;
    assert_eq!(delete.header("mcp-session-id"), Some(SESSION_ID));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn oversized_json_body_is_rejected() -> Result<()> {
    let server = LoopbackServer::start(|_: &RecordedRequest| {
        Reply::raw(&" ".repeat(MAX_BODY_BYTES + 1))
    })
    .await?;

    let result = probe(&server.url("/mcp")).await?;

    assert_eq!(result.health(), HealthStatus::Unhealthy);
    assert!(result.error().is_some_and(|text| text.contains("exceeds")));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unterminated_event_line_is_rejected() -> Result<()> {
    let server = LoopbackServer::start(|_: &RecordedRequest| {
        Reply::raw(&format!("data: {}", "x".repeat(MAX_BODY_BYTES)))
            .with_content_type("text/event-stream")
    })
    .await?;

    let result = probe(&server.url("/mcp")).await?;

    assert_eq!(result.health(), HealthStatus::Unhealthy);
    assert!(result.error().is_some_and(|text| text.contains("exceeds")));
    Ok(())
}
