//! Scripted MCP connector that replays per-endpoint behaviour.

use crate::monitor::domain::Endpoint;
use crate::monitor::ports::{McpConnector, McpSession, McpSessionError, McpSessionResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Behaviour of one scripted endpoint across the three probe stages.
///
/// Delays are served with `tokio::time::sleep`, so tests running on paused
/// time observe exact latencies.
#[derive(Debug, Clone)]
pub struct EndpointScript {
    handshake: Result<(), McpSessionError>,
    handshake_delay: Duration,
    ping: Result<(), McpSessionError>,
    ping_delay: Duration,
    tools: Result<Vec<String>, McpSessionError>,
    list_delay: Duration,
    close_delay: Duration,
}

impl EndpointScript {
    /// An endpoint that completes every stage immediately, advertising
    /// `tool_count` tools.
    #[must_use]
    pub fn healthy(tool_count: usize) -> Self {
        Self {
            handshake: Ok(()),
            handshake_delay: Duration::ZERO,
            ping: Ok(()),
            ping_delay: Duration::ZERO,
            tools: Ok((0..tool_count).map(|index| format!("tool-{index}")).collect()),
            list_delay: Duration::ZERO,
            close_delay: Duration::ZERO,
        }
    }

    /// An endpoint whose handshake fails with `error`.
    #[must_use]
    pub fn failing_handshake(error: McpSessionError) -> Self {
        Self {
            handshake: Err(error),
            ..Self::healthy(0)
        }
    }

    /// An endpoint that refuses connections; no session is handed out.
    #[must_use]
    pub fn refused() -> Self {
        Self::failing_handshake(McpSessionError::connect(std::io::Error::new(
            ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    /// Delays the handshake.
    #[must_use]
    pub const fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// Delays the ping response, which becomes the measured latency.
    #[must_use]
    pub const fn with_ping_delay(mut self, delay: Duration) -> Self {
        self.ping_delay = delay;
        self
    }

    /// Makes the ping fail.
    #[must_use]
    pub fn with_ping_error(mut self, error: McpSessionError) -> Self {
        self.ping = Err(error);
        self
    }

    /// Delays the tool listing.
    #[must_use]
    pub const fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Makes the tool listing fail.
    #[must_use]
    pub fn with_tools_error(mut self, error: McpSessionError) -> Self {
        self.tools = Err(error);
        self
    }

    /// Delays session close; a long delay simulates a hung close.
    #[must_use]
    pub const fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }
}

/// Connector that serves scripted sessions keyed by endpoint URL.
///
/// Unknown URLs behave as refused connections. Handles are cheap clones that
/// share scripts and counters.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMcpConnector {
    state: Arc<ScriptedState>,
}

#[derive(Debug, Default)]
struct ScriptedState {
    scripts: RwLock<HashMap<String, EndpointScript>>,
    connects: AtomicUsize,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl ScriptedMcpConnector {
    /// Creates a connector with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or replaces the script for `url`.
    pub fn script(&self, url: impl Into<String>, script: EndpointScript) {
        self.state
            .scripts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), script);
    }

    /// Returns how many connection attempts were made.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Returns how many sessions were handed out, whether or not their
    /// handshake succeeded.
    #[must_use]
    pub fn opened_count(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Returns how many sessions finished closing.
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    fn script_for(&self, url: &str) -> Option<EndpointScript> {
        self.state
            .scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }
}

#[async_trait]
impl McpConnector for ScriptedMcpConnector {
    async fn connect(&self, endpoint: &Endpoint) -> McpSessionResult<Box<dyn McpSession>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.script_for(endpoint.url()).unwrap_or_else(EndpointScript::refused);
        if let Err(refused @ McpSessionError::Connect(_)) = &script.handshake {
            return Err(refused.clone());
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script,
            closed: Arc::clone(&self.state.closed),
        }))
    }
}

struct ScriptedSession {
    script: EndpointScript,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl McpSession for ScriptedSession {
    async fn initialize(&mut self) -> McpSessionResult<()> {
        tokio::time::sleep(self.script.handshake_delay).await;
        self.script.handshake.clone()
    }

    async fn ping(&mut self) -> McpSessionResult<()> {
        tokio::time::sleep(self.script.ping_delay).await;
        self.script.ping.clone()
    }

    async fn list_tools(&mut self) -> McpSessionResult<Vec<String>> {
        tokio::time::sleep(self.script.list_delay).await;
        self.script.tools.clone()
    }

    async fn close(self: Box<Self>) -> McpSessionResult<()> {
        tokio::time::sleep(self.script.close_delay).await;
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
