//! Identifier types for monitored services and endpoints.

use super::MonitorDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between service identifier and endpoint URL in persisted keys.
const KEY_SEPARATOR: char = '|';

/// Stable catalog identifier of a monitored service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Creates a validated service identifier.
    ///
    /// The input is trimmed. Identifiers may not be empty and may not contain
    /// the `|` history-key separator.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, MonitorDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(MonitorDomainError::EmptyServiceId);
        }
        if normalized.contains(KEY_SEPARATOR) {
            return Err(MonitorDomainError::InvalidServiceId(normalized));
        }
        Ok(Self(normalized))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServiceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Composite key of one endpoint's history series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointKey {
    service_id: ServiceId,
    url: String,
}

impl EndpointKey {
    /// Creates a key from its parts.
    #[must_use]
    pub fn new(service_id: ServiceId, url: impl Into<String>) -> Self {
        Self {
            service_id,
            url: url.into(),
        }
    }

    /// Parses the persisted `"<serviceIdentifier>|<endpointUrl>"` form.
    ///
    /// The string is split at the first `|`; endpoint URLs may themselves
    /// contain the separator.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError::MalformedHistoryKey`] when the separator
    /// is missing or either part is empty.
    pub fn parse(value: &str) -> Result<Self, MonitorDomainError> {
        let (service, url) = value
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| MonitorDomainError::MalformedHistoryKey(value.to_owned()))?;
        if url.is_empty() {
            return Err(MonitorDomainError::MalformedHistoryKey(value.to_owned()));
        }
        let service_id = ServiceId::new(service)
            .map_err(|_| MonitorDomainError::MalformedHistoryKey(value.to_owned()))?;
        Ok(Self::new(service_id, url))
    }

    /// Returns the owning service identifier.
    #[must_use]
    pub const fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}{KEY_SEPARATOR}{}", self.service_id, self.url)
    }
}
