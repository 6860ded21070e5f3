// ==========================================
// Catalog import - API layer
// ==========================================
// Responsibility: transport-neutral operations called by the HTTP layer
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod import_api;

pub use catalog_api::{CatalogApi, TemplateExport};
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportResponse, UploadForm, UploadedFile};
