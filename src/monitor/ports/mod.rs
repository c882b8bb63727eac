//! Port contracts for the monitoring engine.
//!
//! Ports isolate the engine from the network, from persistent storage, and
//! from randomness so each can be replaced by a deterministic adapter in
//! tests.

pub mod ordering;
pub mod persistence;
pub mod prober;
pub mod session;

pub use ordering::{CatalogOrdering, EndpointOrdering, RandomOrdering};
pub use persistence::{
    HistoryDump, HistoryPersistence, HistoryPersistenceError, HistoryPersistenceResult,
};
pub use prober::EndpointProber;
pub use session::{McpConnector, McpSession, McpSessionError, McpSessionResult};
