// ==========================================
// Catalog import - importer layer
// ==========================================
// Responsibility: turn an uploaded spreadsheet into stored products
// Formats: xlsx, xls, csv
// ==========================================

pub mod catalog_importer;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod header_sanitizer;
pub mod importer_trait;
pub mod persister;
pub mod reporter;
pub mod row_processor;
pub mod schema_inferencer;

// Implementations
pub use catalog_importer::CatalogImporterImpl;
pub use error::{ImportError, ImporterResult, ParseFailure};
pub use field_mapper::FieldMappingResolver as FieldMappingResolverImpl;
pub use file_parser::UniversalSpreadsheetReader;
pub use header_sanitizer::HeaderSanitizer as HeaderSanitizerImpl;
pub use persister::ImportPersister as ImportPersisterImpl;
pub use reporter::ImportReporter;
pub use row_processor::{RowContext, RowProcessor as RowProcessorImpl};
pub use schema_inferencer::SchemaInferencer as SchemaInferencerImpl;

// Trait interfaces
pub use importer_trait::{
    CatalogImporter, FieldMappingResolver, HeaderSanitizer, ImportPersister, RowProcessor,
    SchemaInferencer, SpreadsheetReader,
};
