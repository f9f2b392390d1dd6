//! Hearth Server Library
//!
//! Host process for one member of a hearth cluster: the HTTP API and
//! transport, cluster providers, demo grains and observability setup.

pub mod api;
pub mod config;
pub mod discovery;
pub mod grains;
pub mod observability;
pub mod transport;
pub mod version;
