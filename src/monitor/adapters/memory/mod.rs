//! In-memory adapters for deterministic tests and local runs.

mod connector;
mod persistence;

pub use connector::{EndpointScript, ScriptedMcpConnector};
pub use persistence::InMemoryHistoryPersistence;
