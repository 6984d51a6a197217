//! Template routes: `/upload-template`, `/templates`.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use surat_core::templates::Template;

use super::multipart_error;
use crate::error::AppError;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
pub const TEMPLATE_FIELD: &str = "template";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload-template", post(upload_template))
        .route("/templates", get(list_templates))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub template: Template,
}

/// Store an uploaded DOCX template and record its placeholder tags.
pub async fn upload_template(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some(TEMPLATE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(AppError::BadRequest(format!(
            "no file uploaded in field '{TEMPLATE_FIELD}'"
        )));
    };

    let template = state.templates.upload(&filename, bytes).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "template uploaded",
            template,
        }),
    ))
}

/// Every stored template record.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Template>>, AppError> {
    Ok(Json(state.templates.list().await?))
}
