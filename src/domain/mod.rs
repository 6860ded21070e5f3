// ==========================================
// Catalog import - domain layer
// ==========================================

pub mod catalog;
pub mod import;
pub mod product;
pub mod types;

pub use catalog::{
    decode_field_list, derive_tree_position, CatalogCategory, FieldDescriptor, FieldMapping,
    ImportTemplate, NewCategory, TemplateUpsert,
};
pub use import::{
    CategoryRef, ColumnSchema, HeadersProbe, ImportRequest, ImportDebug, ImportHistoryEntry, ImportResult, ImportStats,
    InferredSchema, MappingEntry, PersistFailure, PersistOutcome, ProcessingOutcome,
    ResolvedMapping, RowRejection, SanitizedHeaders, SpreadsheetTable,
};
pub use product::{NewProduct, Product, ProductDraft, PropertyBag};
pub use types::{CellValue, DataType, ImportMode, MappingKind, ProcessingStatus, PropertyValue};
