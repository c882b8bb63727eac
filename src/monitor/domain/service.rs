//! Monitored service and endpoint descriptors.

use super::{EndpointKey, MonitorDomainError, ServiceId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// MCP transport variant spoken by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Legacy HTTP+SSE: a long-lived event stream carries server messages.
    Sse,
    /// Streamable HTTP: every request is a POST answered in its response.
    StreamableHttp,
}

impl TransportKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable_http",
        }
    }

    /// Returns whether the transport supports server-initiated streaming.
    #[must_use]
    pub const fn supports_server_streaming(self) -> bool {
        matches!(self, Self::Sse)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TransportKind {
    type Error = MonitorDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "sse" | "http+sse" => Ok(Self::Sse),
            "streamable_http" | "streamable-http" | "http" => Ok(Self::StreamableHttp),
            _ => Err(MonitorDomainError::UnsupportedTransport(value.to_owned())),
        }
    }
}

/// One network address implementing MCP for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    url: String,
    transport: TransportKind,
    auth_expected: bool,
    label: String,
}

impl Endpoint {
    /// Creates an endpoint descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when `url` is empty or does not start
    /// with `http://` or `https://`.
    pub fn new(url: impl Into<String>, transport: TransportKind) -> Result<Self, MonitorDomainError> {
        let normalized_url = url.into().trim().to_owned();
        if normalized_url.is_empty() {
            return Err(MonitorDomainError::EmptyEndpointUrl);
        }

        let has_valid_prefix =
            normalized_url.starts_with("http://") || normalized_url.starts_with("https://");
        if !has_valid_prefix {
            return Err(MonitorDomainError::InvalidEndpointUrl(normalized_url));
        }

        Ok(Self {
            url: normalized_url,
            transport,
            auth_expected: false,
            label: String::new(),
        })
    }

    /// Sets the informational "authentication expected" hint.
    #[must_use]
    pub const fn with_auth_expected(mut self, auth_expected: bool) -> Self {
        self.auth_expected = auth_expected;
        self
    }

    /// Sets the disambiguation label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into().trim().to_owned();
        self
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the transport variant.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Returns whether the catalog expects the endpoint to require auth.
    #[must_use]
    pub const fn auth_expected(&self) -> bool {
        self.auth_expected
    }

    /// Returns the disambiguation label, empty when none was given.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// One logical monitored provider with one or more endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    id: ServiceId,
    display_name: String,
    version: String,
    sse_only: bool,
    endpoints: Vec<Endpoint>,
}

impl Service {
    /// Creates a service descriptor.
    ///
    /// An empty display name falls back to the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError::NoEndpoints`] when `endpoints` is empty
    /// and [`MonitorDomainError::DuplicateEndpointUrl`] when two endpoints
    /// share a URL, since history is keyed by URL.
    pub fn new(
        id: ServiceId,
        display_name: impl Into<String>,
        version: impl Into<String>,
        endpoints: Vec<Endpoint>,
    ) -> Result<Self, MonitorDomainError> {
        if endpoints.is_empty() {
            return Err(MonitorDomainError::NoEndpoints(id.as_str().to_owned()));
        }

        let mut urls = HashSet::with_capacity(endpoints.len());
        if let Some(repeated) = endpoints.iter().find(|&endpoint| !urls.insert(endpoint.url())) {
            return Err(MonitorDomainError::DuplicateEndpointUrl {
                service: id.as_str().to_owned(),
                url: repeated.url().to_owned(),
            });
        }

        let trimmed_name = display_name.into().trim().to_owned();
        let display_name = if trimmed_name.is_empty() {
            id.as_str().to_owned()
        } else {
            trimmed_name
        };

        Ok(Self {
            id,
            display_name,
            version: version.into().trim().to_owned(),
            sse_only: false,
            endpoints,
        })
    }

    /// Sets the catalog flag stating that every endpoint uses SSE.
    #[must_use]
    pub const fn with_sse_only(mut self, sse_only: bool) -> Self {
        self.sse_only = sse_only;
        self
    }

    /// Returns the service identifier.
    #[must_use]
    pub const fn id(&self) -> &ServiceId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the catalog version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns whether the catalog flags every endpoint as SSE.
    #[must_use]
    pub const fn sse_only(&self) -> bool {
        self.sse_only
    }

    /// Returns the endpoints in catalog order.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Returns the history key of one of this service's endpoints.
    #[must_use]
    pub fn key_for(&self, endpoint: &Endpoint) -> EndpointKey {
        EndpointKey::new(self.id.clone(), endpoint.url())
    }

    /// Returns the history keys of every endpoint.
    pub fn endpoint_keys(&self) -> impl Iterator<Item = EndpointKey> + '_ {
        self.endpoints.iter().map(|endpoint| self.key_for(endpoint))
    }
}
