//! Surat HTTP server.
//!
//! Wires together the core services, storage backend, and HTTP routes into a
//! running Axum server.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
