//! Integration testing module
//!
//! End-to-end tests for the session layer:
//! - Fetching a core from a local server
//! - Single-flight session loading and re-loading after termination
//! - Telemetry delivery alongside file loading

pub mod fixtures;
