// ==========================================
// Catalog import - core library
// ==========================================
// Stack: axum + Rust + SQLite
// Pipeline: spreadsheet upload → inferred schema → field mapping →
// product drafts → stored products
// ==========================================

// i18n initialization
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// Modules
// ==========================================

// Domain layer - entities and value types
pub mod domain;

// Repository layer - data access
pub mod repository;

// Import layer - pipeline stages
pub mod importer;

// Configuration layer
pub mod config;

// Database infrastructure (connection setup / PRAGMAs)
pub mod db;

// Logging
pub mod logging;

// Internationalization
pub mod i18n;

// API layer - transport-neutral operations
pub mod api;

// Application layer - state and HTTP surface
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::{
    CatalogCategory, CellValue, DataType, FieldDescriptor, FieldMapping, ImportResult,
    ImportTemplate, MappingKind, Product, ProductDraft,
};
pub use importer::{CatalogImporter, CatalogImporterImpl, ImportError};
pub use api::{ApiError, CatalogApi, ImportApi};
pub use app::{router, AppState};

// ==========================================
// Constants
// ==========================================

// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Application name
pub const APP_NAME: &str = "Catalog Import";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
