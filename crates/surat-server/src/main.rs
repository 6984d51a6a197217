//! `surat-server` binary.
//!
//! Reads [`ServerConfig`] from the environment, opens storage, builds the
//! services once and serves them until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use surat_server::config::{ServerConfig, StorageBackendType};
use surat_server::routes::build_router;
use surat_server::state::AppState;
use surat_storage::{MemoryBackend, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    init_tracing(&config.log_level);

    tracing::info!(
        storage = ?config.storage_backend,
        bucket = %config.bucket,
        max_upload_bytes = config.max_upload_bytes,
        render_concurrency = config.render_concurrency,
        "starting surat"
    );

    let state = Arc::new(AppState::new(open_storage(&config.storage_backend)?, &config.bucket));
    let app = build_router(state, &config);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("cannot listen on {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server terminated")?;

    tracing::info!("surat stopped");
    Ok(())
}

/// JSON logs; `RUST_LOG` wins over `SURAT_LOG_LEVEL`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().json().with_env_filter(filter).init();
}

fn open_storage(kind: &StorageBackendType) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match kind {
        StorageBackendType::Memory => {
            tracing::warn!("in-memory storage: templates and users are lost on exit");
            Ok(Arc::new(MemoryBackend::new()))
        }
        #[cfg(feature = "redb-backend")]
        StorageBackendType::Redb { path } => {
            let backend = surat_storage::RedbBackend::open(path)
                .with_context(|| format!("cannot open redb database at {path}"))?;
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "redb-backend"))]
        StorageBackendType::Redb { .. } => {
            anyhow::bail!("SURAT_STORAGE=redb needs the 'redb-backend' feature")
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutting down");
}
