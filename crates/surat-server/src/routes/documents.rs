//! Document generation route: `/generate-docx`.
//!
//! Accepts the template id and the replacement fields as JSON, a urlencoded
//! form, or a multipart form, and answers with the rendered DOCX as an
//! attachment.

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde_json::Value;

use surat_core::{DOCX_MEDIA_TYPE, Mapping};

use super::multipart_error;
use crate::error::AppError;
use crate::state::AppState;

/// Request field naming the template to render.
pub const TEMPLATE_ID_FIELD: &str = "templateId";

const OUTPUT_DISPOSITION: &str = "attachment; filename=output.docx";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/generate-docx", post(generate_docx))
}

/// The body of a render request, whatever its encoding.
#[derive(Debug, Default)]
pub struct RenderForm(pub Mapping);

impl RenderForm {
    /// Split off the template id. Non-string ids are taken as their JSON text.
    fn take_template_id(&mut self) -> String {
        match self.0.remove(TEMPLATE_ID_FIELD) {
            Some(Value::String(id)) => id,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

impl<S> FromRequest<S> for RenderForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return match value {
                Value::Object(map) => Ok(Self(map)),
                _ => Err(AppError::BadRequest(
                    "request body must be a JSON object".to_owned(),
                )),
            };
        }

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            let mut fields = Mapping::new();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| multipart_error(&e))?
            {
                let Some(name) = field.name().map(str::to_owned) else {
                    continue;
                };
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                fields.insert(name, Value::String(text));
            }
            return Ok(Self(fields));
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(Self(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ));
        }

        // No body to read fields from.
        Ok(Self::default())
    }
}

/// Render a stored template with the request's fields.
pub async fn generate_docx(
    State(state): State<Arc<AppState>>,
    mut form: RenderForm,
) -> Result<Response, AppError> {
    let template_id = form.take_template_id();
    let bytes = state.templates.render(&template_id, &form.0).await?;

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MEDIA_TYPE),
            (header::CONTENT_DISPOSITION, OUTPUT_DISPOSITION),
        ],
        bytes,
    )
        .into_response())
}
