//! Monitoring engine for remote MCP services.
//!
//! The engine probes every endpoint of every catalogued service on a fixed
//! cycle, records each observation in a bounded history, and derives the
//! externally visible status snapshot on demand. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
