//! Error types for monitoring domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing monitoring domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorDomainError {
    /// The service identifier is empty after trimming.
    #[error("service identifier must not be empty")]
    EmptyServiceId,

    /// The service identifier contains the key separator `|`.
    #[error("service identifier '{0}' must not contain '|'")]
    InvalidServiceId(String),

    /// The endpoint URL is empty after trimming.
    #[error("endpoint URL must not be empty")]
    EmptyEndpointUrl,

    /// The endpoint URL does not have an `http://` or `https://` prefix.
    #[error("endpoint URL '{0}' must start with 'http://' or 'https://'")]
    InvalidEndpointUrl(String),

    /// The catalog names a transport the engine cannot probe.
    #[error("unsupported transport kind: {0}")]
    UnsupportedTransport(String),

    /// A service was declared without any endpoints.
    #[error("service {0} has no endpoints")]
    NoEndpoints(String),

    /// A service lists the same endpoint URL more than once.
    #[error("service {service} lists endpoint {url} more than once")]
    DuplicateEndpointUrl {
        /// Service identifier.
        service: String,
        /// Repeated URL.
        url: String,
    },

    /// A persisted history key is not of the form `service|url`.
    #[error("malformed history key: {0}")]
    MalformedHistoryKey(String),
}

/// Error returned while parsing a health status from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown health status: {0}")]
pub struct ParseHealthStatusError(pub String);

/// Error returned while parsing an auth status from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown auth status: {0}")]
pub struct ParseAuthStatusError(pub String);
