// ==========================================
// Catalog import - pipeline stage traits
// ==========================================
// Responsibility: interfaces of every import stage (no implementations)
// Flow: read → sanitize → infer (headers mode)
//       read → sanitize → resolve → process → persist → report (full mode)
// ==========================================

use crate::domain::catalog::{CatalogCategory, FieldMapping, ImportTemplate};
use crate::domain::import::{
    HeadersProbe, ImportRequest, ImportResult, InferredSchema, PersistOutcome, ProcessingOutcome,
    ResolvedMapping, SanitizedHeaders, SpreadsheetTable,
};
use crate::domain::product::ProductDraft;
use crate::domain::types::CellValue;
use crate::importer::error::ImporterResult;
use crate::importer::row_processor::RowContext;
use async_trait::async_trait;

// ==========================================
// CatalogImporter Trait
// ==========================================
// Purpose: entry point of both run modes
// Implementor: CatalogImporterImpl
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// Headers probe: read the upload and infer its column schema
    ///
    /// Never writes anything.
    async fn probe_headers(&self, request: &ImportRequest) -> ImporterResult<HeadersProbe>;

    /// Full run: map, validate and persist every row of the upload
    ///
    /// # Returns
    /// - Ok(ImportResult): summary with processed / saved / rejected counts
    /// - Err: input or parse errors (nothing written)
    async fn import_full(&self, request: &ImportRequest) -> ImporterResult<ImportResult>;
}

// ==========================================
// SpreadsheetReader Trait
// ==========================================
pub trait SpreadsheetReader: Send + Sync {
    /// Parse an uploaded binary into a logical table
    ///
    /// # Arguments
    /// - bytes: raw upload
    /// - file_name / mime: hints used only to pick CSV vs workbook parsing
    ///
    /// # Errors
    /// - UnreadableFile: no strategy produced a header row
    /// - EmptyFile: headers present, zero data rows
    fn read(&self, bytes: &[u8], file_name: &str, mime: Option<&str>)
        -> ImporterResult<SpreadsheetTable>;
}

// ==========================================
// HeaderSanitizer Trait
// ==========================================
pub trait HeaderSanitizer: Send + Sync {
    /// Clean the raw header row, keeping each survivor's source column
    fn sanitize(&self, raw_headers: &[CellValue]) -> SanitizedHeaders;
}

// ==========================================
// SchemaInferencer Trait
// ==========================================
pub trait SchemaInferencer: Send + Sync {
    /// Infer a per-column type / required flag / unit from sample rows
    fn infer(&self, headers: &SanitizedHeaders, sample_rows: &[Vec<CellValue>]) -> InferredSchema;
}

// ==========================================
// FieldMappingResolver Trait
// ==========================================
pub trait FieldMappingResolver: Send + Sync {
    /// Pick the authoritative header → field mapping
    ///
    /// Priority: user mapping > category mapping > template > identity.
    /// The first non-empty source wins wholesale; never fails.
    fn resolve(
        &self,
        headers: &[String],
        category: &CatalogCategory,
        template: Option<&ImportTemplate>,
        user_mapping: Option<&[FieldMapping]>,
    ) -> ResolvedMapping;
}

// ==========================================
// RowProcessor Trait
// ==========================================
pub trait RowProcessor: Send + Sync {
    /// Build, validate and classify every data row
    fn process(&self, table: &SpreadsheetTable, ctx: &RowContext<'_>) -> ProcessingOutcome;
}

// ==========================================
// ImportPersister Trait
// ==========================================
#[async_trait]
pub trait ImportPersister: Send + Sync {
    /// Persist accepted drafts one at a time
    ///
    /// A failing draft is recorded and skipped; it never affects siblings.
    async fn persist(&self, category_id: &str, accepted: &[ProductDraft]) -> PersistOutcome;
}
