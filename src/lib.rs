//! cb-provision - declarative bucket and DDL provisioning for Couchbase clusters.
//!
//! This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod provision;
