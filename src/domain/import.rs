// ==========================================
// Catalog import - import run model
// ==========================================
// Ephemeral per-upload structures plus the result DTO and the
// history entry written after a full run
// ==========================================

use crate::domain::catalog::{FieldDescriptor, FieldMapping};
use crate::domain::product::ProductDraft;
use crate::domain::types::{CellValue, DataType, MappingKind, ProcessingStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ImportRequest - one upload submitted to the pipeline
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub category_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub user_mapping: Option<Vec<FieldMapping>>,
    /// Field selection of the run (required list and auto-created template)
    pub selected_fields: Option<Vec<FieldDescriptor>>,
    pub template_id: Option<String>,
}

/// Response of the headers probe
#[derive(Debug, Clone, Serialize)]
pub struct HeadersProbe {
    pub ok: bool,
    pub message: String,
    pub headers: Vec<String>,
    pub schema: Vec<ColumnSchema>,
    pub header_keys: BTreeMap<String, String>,
    pub total_rows: usize,
    pub sheet_name: Option<String>,
}

// ==========================================
// SpreadsheetTable - logical table of one upload
// ==========================================
// Rows may be shorter or longer than `headers`; `cell` returns `None`
// instead of failing for out-of-range access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadsheetTable {
    pub headers: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
    pub sheet_name: Option<String>,
    pub strategy: String,
}

impl SpreadsheetTable {
    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

// ==========================================
// SanitizedHeaders - user-facing header list
// ==========================================
// `source_indices[i]` is the original column of `names[i]`; rows are
// always read through it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SanitizedHeaders {
    pub names: Vec<String>,
    pub source_indices: Vec<usize>,
}

impl SanitizedHeaders {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(header, cell)` pairs of one row, in header order
    pub fn zip_row<'a>(
        &'a self,
        row: &'a [CellValue],
    ) -> impl Iterator<Item = (&'a str, Option<&'a CellValue>)> + 'a {
        self.names
            .iter()
            .zip(self.source_indices.iter())
            .map(move |(name, idx)| (name.as_str(), row.get(*idx)))
    }
}

// ==========================================
// ColumnSchema - inferred per-column descriptor
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub key: String,            // field_<1-based index>
    pub display_name: String,   // original header
    pub data_type: DataType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Inferred schema plus the companion header → key table
#[derive(Debug, Clone, Default, Serialize)]
pub struct InferredSchema {
    pub columns: Vec<ColumnSchema>,
    pub header_keys: BTreeMap<String, String>,
}

impl InferredSchema {
    pub fn column_for(&self, header: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.display_name == header)
    }
}

// ==========================================
// ResolvedMapping - authoritative header → field mapping of a run
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source_header: String,
    pub target_field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMapping {
    pub kind: MappingKind,
    pub entries: Vec<MappingEntry>,
    /// Template field descriptors replacing the working category property
    /// list for this run (set only when the template source wins)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_override: Option<Vec<FieldDescriptor>>,
}

impl ResolvedMapping {
    pub fn target_for(&self, header: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.source_header == header)
            .map(|e| e.target_field.as_str())
    }
}

// ==========================================
// Row processing outcome
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    pub row_number: usize,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessingOutcome {
    pub accepted: Vec<ProductDraft>,
    pub rejected: Vec<RowRejection>,
}

impl ProcessingOutcome {
    pub fn warnings(&self) -> impl Iterator<Item = &String> {
        self.accepted.iter().flat_map(|d| d.warnings.iter())
    }
}

// ==========================================
// Persistence outcome
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct PersistFailure {
    pub row_number: usize,
    pub sku: String,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct PersistOutcome {
    pub attempted: usize,
    pub saved: Vec<crate::domain::product::Product>,
    pub failures: Vec<PersistFailure>,
}

// ==========================================
// ImportResult - summary of a full run
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub message: String,
    pub note: String,
    pub category: CategoryRef,
    pub filename: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub mapping: ResolvedMapping,
    pub headers: Vec<String>,

    // ===== Counters =====
    pub total_rows: usize,
    pub valid_rows: usize,
    pub imported: usize,
    pub error_rows: usize,
    pub total_processed: usize,
    pub database_saved: usize,
    pub failed_products: usize,
    pub error_stats: BTreeMap<String, usize>,

    // ===== Samples =====
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub failures: Vec<PersistFailure>,
    pub products: Vec<ProductDraft>,

    // ===== Status =====
    pub processing_status: ProcessingStatus,
    pub alert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_reason: Option<String>,

    pub category_properties: Vec<FieldDescriptor>,
    pub required_fields: Vec<String>,
    pub debug: ImportDebug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportDebug {
    pub first_row: Option<Vec<CellValue>>,
    pub mapping_kind: MappingKind,
    pub sheet_name: Option<String>,
    pub read_strategy: String,
    pub sample_product: Option<ProductDraft>,
}

// ==========================================
// ImportHistoryEntry - import log row
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportHistoryEntry {
    pub id: String,
    pub category: String,
    pub filename: String,
    pub products_count: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counters per category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStats {
    pub catalog_category_id: String,
    pub imports_total: i64,
    pub products_imported_total: i64,
    pub last_import_at: Option<DateTime<Utc>>,
}
