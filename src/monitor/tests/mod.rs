//! Unit tests for the monitoring engine.
//!
//! Tests are grouped by component; shared builders and fake collaborators
//! live in `fixtures`.
