// ==========================================
// Catalog import - import API
// ==========================================
// Responsibility: validate an upload form, dispatch it to the importer
// in the requested mode, expose import history
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::import::{HeadersProbe, ImportHistoryEntry, ImportRequest, ImportResult};
use crate::domain::types::ImportMode;
use crate::importer::error::ImportError;
use crate::importer::field_mapper::{parse_field_selection, parse_user_mapping};
use crate::importer::CatalogImporter;
use crate::repository::import_history_repo::DEFAULT_HISTORY_LIMIT;
use crate::repository::ImportHistoryRepository;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Accepted declared MIME types
pub const ALLOWED_MIME_TYPES: [&str; 3] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "text/csv",
];

const ALLOWED_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".csv"];

/// Upper bound of one history page
pub const MAX_HISTORY_LIMIT: usize = 500;

// ==========================================
// Upload form
// ==========================================

/// Uploaded file part
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Multipart fields of one import request (all raw, unvalidated)
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub category: Option<String>,
    pub mode: Option<String>,
    pub mapping: Option<String>,
    pub fields: Option<String>,
    pub template_id: Option<String>,
}

/// Response of either mode
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ImportResponse {
    Headers(HeadersProbe),
    Full(Box<ImportResult>),
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check the declared MIME type (or, without one, the file extension)
///
/// # Returns
/// - Ok(Some(mime)): normalised declared type
/// - Ok(None): no declared type, extension accepted
pub fn check_file_type(file_name: &str, mime: Option<&str>) -> ApiResult<Option<String>> {
    let declared = mime
        .map(|m| m.split(';').next().unwrap_or("").trim().to_lowercase())
        .filter(|m| !m.is_empty());

    match declared {
        Some(m) if ALLOWED_MIME_TYPES.contains(&m.as_str()) => Ok(Some(m)),
        Some(m) => Err(ImportError::UnsupportedFormat(m).into()),
        None => {
            let lower = file_name.to_lowercase();
            if ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                Ok(None)
            } else {
                Err(ImportError::UnsupportedFormat(file_name.to_string()).into())
            }
        }
    }
}

/// Validate a form into the run mode and the importer request
pub fn build_request(form: UploadForm) -> ApiResult<(ImportMode, ImportRequest)> {
    let mode = form
        .mode
        .as_deref()
        .unwrap_or("full")
        .parse::<ImportMode>()
        .map_err(ApiError::InvalidInput)?;

    let file = form
        .file
        .filter(|f| !f.bytes.is_empty())
        .ok_or(ImportError::MissingFile)?;
    let category_id = non_blank(form.category).ok_or(ImportError::MissingCategory)?;
    let mime_type = check_file_type(&file.file_name, file.mime_type.as_deref())?;

    let user_mapping = match non_blank(form.mapping) {
        Some(raw) => Some(parse_user_mapping(&raw)?).filter(|m| !m.is_empty()),
        None => None,
    };
    let selected_fields = match non_blank(form.fields) {
        Some(raw) => Some(parse_field_selection(&raw)?).filter(|f| !f.is_empty()),
        None => None,
    };

    Ok((
        mode,
        ImportRequest {
            category_id,
            file_name: file.file_name,
            mime_type,
            bytes: file.bytes,
            user_mapping,
            selected_fields,
            template_id: non_blank(form.template_id),
        },
    ))
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi {
    importer: Arc<dyn CatalogImporter>,
    history_repo: Arc<dyn ImportHistoryRepository>,
}

impl ImportApi {
    pub fn new(
        importer: Arc<dyn CatalogImporter>,
        history_repo: Arc<dyn ImportHistoryRepository>,
    ) -> Self {
        Self {
            importer,
            history_repo,
        }
    }

    /// Run an upload in its requested mode
    ///
    /// # Returns
    /// - Headers: header list and inferred schema (nothing written)
    /// - Full: run summary
    /// - Err(ApiError): fatal request / parse / lookup errors
    pub async fn import_upload(&self, form: UploadForm) -> ApiResult<ImportResponse> {
        let (mode, request) = build_request(form).map_err(|e| {
            warn!(error = %e, "import request rejected");
            e
        })?;
        info!(
            mode = ?mode,
            category_id = %request.category_id,
            file_name = %request.file_name,
            size = request.bytes.len(),
            "import request accepted"
        );

        match mode {
            ImportMode::Headers => {
                let probe = self.importer.probe_headers(&request).await?;
                Ok(ImportResponse::Headers(probe))
            }
            ImportMode::Full => {
                let result = self.importer.import_full(&request).await?;
                Ok(ImportResponse::Full(Box::new(result)))
            }
        }
    }

    /// Newest history entries first
    pub async fn list_history(&self, limit: Option<usize>) -> ApiResult<Vec<ImportHistoryEntry>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.history_repo.list_recent(limit).await?)
    }
}
