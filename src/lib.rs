//! Vigil: health monitoring for remote MCP services.
//!
//! This crate probes Model Context Protocol services over HTTP, classifies
//! each endpoint into a health state and an independent authentication
//! state, keeps a rolling 24-hour history per endpoint, and aggregates that
//! history into a status snapshot for a serving layer.
//!
//! # Architecture
//!
//! Vigil follows hexagonal architecture principles:
//!
//! - **Domain**: Pure monitoring types with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for protocol sessions, endpoint
//!   ordering, and history persistence
//! - **Adapters**: Concrete implementations of ports (HTTP, JSON file,
//!   in-memory)
//! - **Services**: Prober, scheduler, history store, and aggregation
//!
//! # Modules
//!
//! - [`monitor`]: The monitoring engine
//! - [`config`]: Tunable engine settings
//! - [`telemetry`]: Tracing subscriber setup

pub mod config;
pub mod monitor;
pub mod telemetry;
