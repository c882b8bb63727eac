//! Catalog loading: decoding, normalization, and de-duplication.

use crate::monitor::domain::{CatalogRecord, Service};
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that prevent a catalog from loading at all.
///
/// Individual invalid records are skipped, not reported here.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Read {
        /// Catalog path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not a JSON array.
    #[error("catalog is not a JSON array of service records: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes a catalog document into services.
///
/// Records that fail to decode or validate are logged and skipped; when an
/// identifier repeats, the first record wins.
///
/// # Errors
///
/// Returns [`CatalogError::Malformed`] when the document is not a JSON
/// array.
pub fn parse_catalog(document: &str) -> Result<Vec<Service>, CatalogError> {
    let records: Vec<Value> = serde_json::from_str(document)?;
    let mut seen = HashSet::new();
    let mut services = Vec::with_capacity(records.len());

    for (position, raw) in records.into_iter().enumerate() {
        let record: CatalogRecord = match serde_json::from_value(raw) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(position, error = %err, "skipping undecodable catalog record");
                continue;
            }
        };
        let identifier = record.identifier().to_owned();
        let service = match Service::try_from(record) {
            Ok(service) => service,
            Err(err) => {
                tracing::warn!(
                    position,
                    identifier = identifier.as_str(),
                    error = %err,
                    "skipping invalid catalog record"
                );
                continue;
            }
        };
        if !seen.insert(service.id().clone()) {
            tracing::warn!(
                position,
                identifier = identifier.as_str(),
                "skipping duplicate catalog identifier"
            );
            continue;
        }
        services.push(service);
    }
    Ok(services)
}

/// Reads and decodes a catalog file.
///
/// # Errors
///
/// Returns [`CatalogError`] when the file cannot be read or is not a JSON
/// array.
pub fn load_catalog(path: &Utf8Path) -> Result<Vec<Service>, CatalogError> {
    let read_error = |source: std::io::Error| CatalogError::Read {
        path: path.to_string(),
        source,
    };
    let file_name = path.file_name().ok_or_else(|| {
        read_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "catalog path must name a file",
        ))
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    let document = dir.read_to_string(file_name).map_err(read_error)?;
    parse_catalog(&document)
}
