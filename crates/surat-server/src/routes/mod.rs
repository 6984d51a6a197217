//! HTTP routes.
//!
//! | Method | Path               | Handler |
//! |--------|--------------------|---------|
//! | GET    | `/`                | liveness banner |
//! | POST   | `/upload-template` | [`templates::upload_template`] |
//! | GET    | `/templates`       | [`templates::list_templates`] |
//! | POST   | `/generate-docx`   | [`documents::generate_docx`] |
//! | POST   | `/register`        | [`users::register`] |
//! | GET    | `/profile/{uid}`   | [`users::profile`] |

pub mod documents;
pub mod templates;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::multipart::MultipartError;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Build the full application router with middleware.
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    // Rendering runs on the blocking pool; cap how many run at once.
    let render_routes =
        documents::router().layer(tower::limit::ConcurrencyLimitLayer::new(config.render_concurrency));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index))
        .merge(templates::router())
        .merge(render_routes)
        .merge(users::router())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

async fn index() -> &'static str {
    "Surat template server"
}

/// Map a multipart read failure, keeping the body-limit case distinct.
pub(crate) fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
