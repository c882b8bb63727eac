//! Adapter implementations for the monitoring ports.

pub mod file;
pub mod http;
pub mod memory;

pub use file::JsonFileHistoryPersistence;
pub use http::HttpMcpConnector;
pub use memory::{EndpointScript, InMemoryHistoryPersistence, ScriptedMcpConnector};
