//! User routes: `/register`, `/profile/{uid}`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use surat_core::users::{RegisterRequest, UserProfile};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/profile/{uid}", get(profile))
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub uid: String,
    pub email: String,
    pub message: &'static str,
}

/// Create an account and its profile.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let identity = state.users.register(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            uid: identity.uid,
            email: identity.email,
            message: "user registered",
        }),
    ))
}

/// A user's stored profile.
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.users.profile(&uid).await?))
}
