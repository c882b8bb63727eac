//! Catalog record shapes and their normalization into [`Service`] values.
//!
//! The ingestion collaborator emits one of two JSON shapes per service. The
//! canonical shape lists endpoints explicitly; the legacy flat shape carries
//! a single endpoint inline. Both shapes are normalized here and nowhere
//! else, so the rest of the engine only ever sees [`Service`].

use super::{Endpoint, MonitorDomainError, Service, ServiceId, TransportKind};
use serde::Deserialize;

/// Transport assumed when a legacy record omits one.
const LEGACY_DEFAULT_TRANSPORT: &str = "streamable_http";

/// One service record as published by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CatalogRecord {
    /// Canonical multi-endpoint shape.
    Current(CurrentRecord),
    /// Legacy single-endpoint flat shape.
    Legacy(LegacyRecord),
}

/// Canonical catalog record with an explicit endpoint list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentRecord {
    identifier: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    single_transport_flag: bool,
    endpoints: Vec<EndpointRecord>,
}

/// Endpoint entry of a canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    url: String,
    transport_kind: String,
    #[serde(default)]
    auth_hint: bool,
    #[serde(default)]
    label: String,
}

/// Legacy flat catalog record describing exactly one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRecord {
    identifier: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    version: String,
    url: String,
    #[serde(default)]
    transport: Option<String>,
    #[serde(default)]
    requires_auth: bool,
}

impl CatalogRecord {
    /// Returns the raw identifier as published, before validation.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Current(record) => &record.identifier,
            Self::Legacy(record) => &record.identifier,
        }
    }
}

impl EndpointRecord {
    fn into_endpoint(self) -> Result<Endpoint, MonitorDomainError> {
        let transport = TransportKind::try_from(self.transport_kind.as_str())?;
        Ok(Endpoint::new(self.url, transport)?
            .with_auth_expected(self.auth_hint)
            .with_label(self.label))
    }
}

impl TryFrom<CatalogRecord> for Service {
    type Error = MonitorDomainError;

    fn try_from(record: CatalogRecord) -> Result<Self, Self::Error> {
        match record {
            CatalogRecord::Current(current) => {
                let id = ServiceId::new(current.identifier)?;
                let endpoints = current
                    .endpoints
                    .into_iter()
                    .map(EndpointRecord::into_endpoint)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::new(id, current.display_name, current.version, endpoints)?
                    .with_sse_only(current.single_transport_flag))
            }
            CatalogRecord::Legacy(legacy) => {
                let id = ServiceId::new(legacy.identifier)?;
                let transport_name = legacy
                    .transport
                    .as_deref()
                    .unwrap_or(LEGACY_DEFAULT_TRANSPORT);
                let transport = TransportKind::try_from(transport_name)?;
                let endpoint = Endpoint::new(legacy.url, transport)?
                    .with_auth_expected(legacy.requires_auth);
                Ok(Self::new(id, legacy.display_name, legacy.version, vec![endpoint])?
                    .with_sse_only(transport == TransportKind::Sse))
            }
        }
    }
}
