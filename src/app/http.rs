// ==========================================
// Catalog import - HTTP surface
// ==========================================
// Responsibility: axum routes over the API layer
// Routes:
//   POST /api/admin/import/universal      multipart upload (headers | full)
//   GET  /api/admin/import/history        recent import runs
//   GET  /api/admin/import-templates      template listing
//   POST /api/admin/import-templates      template upsert
//   GET  /api/admin/import-templates/export  fill-in CSV of a template
//   POST /api/admin/categories            category creation
//   GET  /api/admin/categories/{id}       category lookup
//   GET  /api/health
// ==========================================

use crate::api::catalog_api::EXPORT_CONTENT_TYPE;
use crate::api::{ApiError, ImportResponse, UploadForm, UploadedFile};
use crate::app::state::AppState;
use crate::domain::catalog::{NewCategory, TemplateUpsert};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

// ==========================================
// Error response
// ==========================================
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "error": message,
            "code": self.code(),
        });
        if !self.attempts().is_empty() {
            body["debug"] = json!({ "attempts": self.attempts() });
        }

        (status, Json(body)).into_response()
    }
}

// ==========================================
// Router
// ==========================================
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/admin/import/universal", post(import_universal))
        .route("/api/admin/import/history", get(import_history))
        .route(
            "/api/admin/import-templates",
            get(list_templates).post(upsert_template),
        )
        .route("/api/admin/import-templates/export", get(export_template))
        .route("/api/admin/categories", post(create_category))
        .route("/api/admin/categories/{id}", get(get_category))
        // Multipart reads are bounded by the outer limit only
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==========================================
// Handlers
// ==========================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// Collect the multipart fields of an upload
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
                form.file = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            "category" | "mode" | "mapping" | "fields" | "templateId" | "template_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
                match name.as_str() {
                    "category" => form.category = Some(value),
                    "mode" => form.mode = Some(value),
                    "mapping" => form.mapping = Some(value),
                    "fields" => form.fields = Some(value),
                    _ => form.template_id = Some(value),
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

async fn import_universal(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let form = read_upload_form(multipart).await?;
    let response = state.import_api.import_upload(form).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn import_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let history = state.import_api.list_history(params.limit).await?;
    Ok(Json(json!({ "count": history.len(), "history": history })))
}

#[derive(Debug, Deserialize)]
struct TemplateParams {
    catalog_category_id: Option<String>,
}

async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<TemplateParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let templates = state
        .catalog_api
        .list_templates(params.catalog_category_id.as_deref())
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": templates.len(),
        "templates": templates,
    })))
}

async fn upsert_template(
    State(state): State<AppState>,
    Json(input): Json<TemplateUpsert>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let template = state.catalog_api.upsert_template(input).await?;
    Ok(Json(json!({ "success": true, "template": template })))
}

#[derive(Debug, Deserialize)]
struct ExportParams {
    #[serde(alias = "templateId")]
    template_id: Option<String>,
    #[serde(alias = "categoryId", alias = "catalog_category_id")]
    category_id: Option<String>,
}

async fn export_template(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let export = state
        .catalog_api
        .export_template(params.template_id.as_deref(), params.category_id.as_deref())
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, EXPORT_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.file_name),
            ),
        ],
        export.bytes,
    )
        .into_response())
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<NewCategory>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let category = state.catalog_api.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(json!(category))))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let category = state.catalog_api.get_category(&id).await?;
    Ok(Json(json!(category)))
}
