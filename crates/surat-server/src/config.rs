//! Server configuration for Surat.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `SURAT_*` environment variables.

use std::net::SocketAddr;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_RENDER_CONCURRENCY: usize = 16;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Bucket template files are stored in.
    pub bucket: String,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    /// Renders allowed to run at once.
    pub render_concurrency: usize,
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// Redb persistent storage.
    Redb { path: String },
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `SURAT_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:5000`)
    /// - `SURAT_STORAGE`: `memory` or `redb` (default: `memory`)
    /// - `SURAT_STORAGE_PATH`: redb file path (default: `./data/surat.redb`)
    /// - `SURAT_BUCKET`: template bucket name (default: `surat-templates`)
    /// - `SURAT_LOG_LEVEL`: log filter (default: `info`)
    /// - `SURAT_MAX_UPLOAD_BYTES`: request body limit (default: 10 MiB)
    /// - `SURAT_RENDER_CONCURRENCY`: concurrent renders (default: `16`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        // Priority: SURAT_BIND_ADDR > PORT > default 127.0.0.1:5000
        let bind_addr = if let Some(addr) = var("SURAT_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
        } else if let Some(port_str) = var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
        };

        let storage_path =
            var("SURAT_STORAGE_PATH").unwrap_or_else(|| "./data/surat.redb".to_owned());

        let storage_backend = match var("SURAT_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "redb" => StorageBackendType::Redb { path: storage_path },
            _ => StorageBackendType::Memory,
        };

        let bucket = var("SURAT_BUCKET")
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| "surat-templates".to_owned());

        let log_level = var("SURAT_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let max_upload_bytes = var("SURAT_MAX_UPLOAD_BYTES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let render_concurrency = var("SURAT_RENDER_CONCURRENCY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_RENDER_CONCURRENCY);

        Self {
            bind_addr,
            storage_backend,
            bucket,
            log_level,
            max_upload_bytes,
            render_concurrency,
        }
    }
}
