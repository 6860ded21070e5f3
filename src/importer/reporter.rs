// ==========================================
// Catalog import - run reporter
// ==========================================
// Responsibility: build the ImportResult of a full run and perform the
// follow-up writes (statistics, history, product count, template)
// Policy: follow-up writes are best-effort; failures are logged and
// never reach the caller
// ==========================================

use crate::config::ImportSettings;
use crate::domain::catalog::{CatalogCategory, FieldDescriptor, FieldMapping, TemplateUpsert};
use crate::domain::import::{
    CategoryRef, ImportDebug, ImportRequest, ImportResult, PersistOutcome, ProcessingOutcome,
    ResolvedMapping, SanitizedHeaders, SpreadsheetTable,
};
use crate::domain::types::{MappingKind, ProcessingStatus};
use crate::i18n::{t, t_with_args};
use crate::importer::file_parser::SourceFormat;
use crate::repository::{CategoryRepository, ImportHistoryRepository, TemplateRepository};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const CSV_MIME: &str = "text/csv";
const WORKBOOK_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// ==========================================
// RunSnapshot - everything a full run produced
// ==========================================
pub struct RunSnapshot<'a> {
    pub request: &'a ImportRequest,
    /// Working category (template property override already applied)
    pub category: &'a CatalogCategory,
    pub table: &'a SpreadsheetTable,
    pub headers: &'a SanitizedHeaders,
    pub mapping: &'a ResolvedMapping,
    pub required_fields: &'a [FieldDescriptor],
    pub processing: &'a ProcessingOutcome,
    pub persistence: &'a PersistOutcome,
}

/// Build the run summary (pure)
pub fn summarize(run: &RunSnapshot<'_>, settings: &ImportSettings) -> ImportResult {
    let accepted = &run.processing.accepted;
    let rejected = &run.processing.rejected;
    let persistence = run.persistence;

    let mut error_stats: BTreeMap<String, usize> = BTreeMap::new();
    for reason in rejected.iter().flat_map(|r| r.reasons.iter()) {
        *error_stats.entry(reason.clone()).or_insert(0) += 1;
    }
    for failure in &persistence.failures {
        *error_stats.entry(failure.error.clone()).or_insert(0) += 1;
    }

    let errors: Vec<String> = rejected
        .iter()
        .flat_map(|r| {
            let row = r.row_number.to_string();
            r.reasons
                .iter()
                .map(move |reason| {
                    t_with_args("row.rejected", &[("row", row.as_str()), ("reason", reason.as_str())])
                })
        })
        .take(settings.error_sample_limit)
        .collect();

    let warnings: Vec<String> = run
        .processing
        .warnings()
        .take(settings.error_sample_limit)
        .cloned()
        .collect();

    let saved = persistence.saved.len();
    let processing_status = if rejected.is_empty() && persistence.failures.is_empty() {
        ProcessingStatus::Success
    } else {
        ProcessingStatus::Partial
    };

    let alert_reason = if accepted.is_empty() {
        Some(t("import.alert_no_valid_rows"))
    } else if saved == 0 {
        Some(t("import.alert_nothing_saved"))
    } else {
        None
    };

    let message = match &alert_reason {
        Some(reason) => reason.clone(),
        None => {
            let (saved_s, processed_s) = (saved.to_string(), accepted.len().to_string());
            let key = match processing_status {
                ProcessingStatus::Success => "import.completed",
                ProcessingStatus::Partial => "import.completed_with_errors",
            };
            t_with_args(key, &[("saved", saved_s.as_str()), ("processed", processed_s.as_str())])
        }
    };

    let note = if settings.rename_to_target_field {
        t("import.note_renamed")
    } else {
        t("import.note_original_headers")
    };

    ImportResult {
        message,
        note,
        category: CategoryRef {
            id: run.category.id.clone(),
            name: run.category.name.clone(),
        },
        filename: run.request.file_name.clone(),
        size: run.request.bytes.len() as u64,
        file_type: file_type(run.request),
        mapping: run.mapping.clone(),
        headers: run.headers.names.clone(),

        total_rows: run.table.rows.len(),
        valid_rows: accepted.len(),
        imported: accepted.len(),
        error_rows: rejected.len(),
        total_processed: accepted.len(),
        database_saved: saved,
        failed_products: persistence.failures.len(),
        error_stats,

        errors,
        warnings,
        failures: persistence
            .failures
            .iter()
            .take(settings.error_sample_limit)
            .cloned()
            .collect(),
        products: accepted.iter().take(settings.preview_limit).cloned().collect(),

        processing_status,
        alert: alert_reason.is_some(),
        alert_reason,

        category_properties: run.category.properties.clone(),
        required_fields: run
            .required_fields
            .iter()
            .map(|f| f.field_name.clone())
            .collect(),
        debug: ImportDebug {
            first_row: run.table.rows.first().cloned(),
            mapping_kind: run.mapping.kind,
            sheet_name: run.table.sheet_name.clone(),
            read_strategy: run.table.strategy.clone(),
            sample_product: accepted.first().cloned(),
        },
    }
}

fn file_type(request: &ImportRequest) -> String {
    match request.mime_type.as_deref().map(str::trim) {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => match SourceFormat::detect(&request.file_name, None) {
            SourceFormat::Csv => CSV_MIME.to_string(),
            SourceFormat::Workbook => WORKBOOK_MIME.to_string(),
        },
    }
}

/// Template written after a run when the category has none
///
/// Built from the field selection, else from an explicit or category
/// mapping; identity and template mappings produce nothing.
pub fn template_from_run(
    category: &CatalogCategory,
    selected_fields: Option<&[FieldDescriptor]>,
    mapping: &ResolvedMapping,
) -> Option<TemplateUpsert> {
    let (field_mappings, required): (Vec<FieldMapping>, Vec<FieldDescriptor>) = match selected_fields {
        Some(fields) if !fields.is_empty() => {
            let mappings = fields
                .iter()
                .map(|f| FieldMapping {
                    source_header: f.display_name.clone().unwrap_or_else(|| f.field_name.clone()),
                    field_name: f.field_name.clone(),
                    display_name: f.display_name.clone(),
                    data_type: f.data_type,
                    is_required: f.is_required,
                })
                .collect();
            let required = fields.iter().filter(|f| f.is_required).cloned().collect();
            (mappings, required)
        }
        _ => match mapping.kind {
            MappingKind::Explicit | MappingKind::Category if !mapping.entries.is_empty() => {
                let mappings = mapping
                    .entries
                    .iter()
                    .map(|e| FieldMapping::new(e.source_header.clone(), e.target_field.clone()))
                    .collect();
                (mappings, category.required_properties())
            }
            _ => return None,
        },
    };

    Some(TemplateUpsert {
        catalog_category_id: category.id.clone(),
        name: t_with_args("import.template_name", &[("category", category.name.as_str())]),
        description: None,
        field_mappings: serde_json::to_value(&field_mappings).ok()?,
        required_fields: serde_json::to_value(&required).ok()?,
        calculator_fields: serde_json::Value::Array(Vec::new()),
        export_fields: serde_json::Value::Array(Vec::new()),
        validation_rules: serde_json::Value::Object(serde_json::Map::new()),
    })
}

// ==========================================
// ImportReporter - follow-up writes of a full run
// ==========================================
pub struct ImportReporter {
    category_repo: Arc<dyn CategoryRepository>,
    template_repo: Arc<dyn TemplateRepository>,
    history_repo: Arc<dyn ImportHistoryRepository>,
}

impl ImportReporter {
    pub fn new(
        category_repo: Arc<dyn CategoryRepository>,
        template_repo: Arc<dyn TemplateRepository>,
        history_repo: Arc<dyn ImportHistoryRepository>,
    ) -> Self {
        Self {
            category_repo,
            template_repo,
            history_repo,
        }
    }

    /// Run every follow-up write; each one fails on its own
    pub async fn record(&self, result: &ImportResult, auto_template: Option<TemplateUpsert>) {
        let category_id = result.category.id.as_str();
        let saved = result.database_saved as i64;
        let status = result.processing_status.to_string();

        let stats = async {
            if let Err(e) = self.history_repo.record_import(category_id, saved).await {
                warn!(category_id, error = %e, "import statistics update failed");
            }
        };

        let history = async {
            if let Err(e) = self
                .history_repo
                .append(&result.category.name, &result.filename, saved, &status)
                .await
            {
                warn!(category_id, error = %e, "import history append failed");
            }
        };

        let count = async {
            match self.category_repo.recompute_product_count(category_id).await {
                Ok(n) => debug!(category_id, products_count = n, "product count refreshed"),
                Err(e) => warn!(category_id, error = %e, "product count refresh failed"),
            }
        };

        let template = async {
            let Some(input) = auto_template else {
                return;
            };
            match self.template_repo.create_if_absent(&input).await {
                Ok(true) => info!(category_id, "import template created"),
                Ok(false) => debug!(category_id, "import template already present"),
                Err(e) => warn!(category_id, error = %e, "import template creation failed"),
            }
        };

        futures::join!(stats, history, count, template);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::{MappingEntry, PersistFailure, RowRejection};
    use crate::domain::product::ProductDraft;
    use crate::importer::row_processor::REASON_NO_DATA;
    use chrono::Utc;

    fn category() -> CatalogCategory {
        CatalogCategory {
            id: "cat-1".into(),
            name: "Двери".into(),
            parent_id: None,
            level: 0,
            path: String::new(),
            sort_order: 0,
            is_active: true,
            properties: vec![FieldDescriptor::new("Название").required()],
            import_mapping: BTreeMap::new(),
            products_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn mapping(kind: MappingKind) -> ResolvedMapping {
        ResolvedMapping {
            kind,
            entries: vec![MappingEntry {
                source_header: "Название".into(),
                target_field: "name".into(),
            }],
            property_override: None,
        }
    }

    fn drafts(n: usize) -> Vec<ProductDraft> {
        (0..n)
            .map(|i| ProductDraft {
                row_number: i + 2,
                ..Default::default()
            })
            .collect()
    }

    fn request() -> ImportRequest {
        ImportRequest {
            category_id: "cat-1".into(),
            file_name: "doors.csv".into(),
            bytes: vec![0; 42],
            ..Default::default()
        }
    }

    #[test]
    fn test_counts_and_status() {
        let (req, cat, m) = (request(), category(), mapping(MappingKind::Category));
        let table = SpreadsheetTable {
            rows: vec![vec![]; 13],
            ..Default::default()
        };
        let headers = SanitizedHeaders::default();
        let processing = ProcessingOutcome {
            accepted: drafts(12),
            rejected: vec![RowRejection {
                row_number: 7,
                reasons: vec![REASON_NO_DATA.into()],
            }],
        };
        let persistence = PersistOutcome {
            attempted: 12,
            saved: Vec::new(),
            failures: Vec::new(),
        };
        let run = RunSnapshot {
            request: &req,
            category: &cat,
            table: &table,
            headers: &headers,
            mapping: &m,
            required_fields: &[],
            processing: &processing,
            persistence: &persistence,
        };

        let result = summarize(&run, &ImportSettings::default());
        assert_eq!(result.total_rows, 13);
        assert_eq!(result.imported, 12);
        assert_eq!(result.error_rows, 1);
        assert_eq!(result.products.len(), 10);
        assert_eq!(result.error_stats[REASON_NO_DATA], 1);
        assert_eq!(result.processing_status, ProcessingStatus::Partial);
        assert_eq!(result.size, 42);
        assert_eq!(result.file_type, CSV_MIME);
        // nothing saved
        assert!(result.alert);
        assert!(result.alert_reason.is_some());
    }

    #[test]
    fn test_failures_feed_error_stats() {
        let (req, cat, m) = (request(), category(), mapping(MappingKind::Fallback));
        let table = SpreadsheetTable {
            rows: vec![vec![]; 2],
            ..Default::default()
        };
        let headers = SanitizedHeaders::default();
        let processing = ProcessingOutcome {
            accepted: drafts(2),
            rejected: Vec::new(),
        };
        let failure = PersistFailure {
            row_number: 3,
            sku: "A-1".into(),
            name: "x".into(),
            error: "duplicate sku".into(),
        };
        let persistence = PersistOutcome {
            attempted: 2,
            saved: Vec::new(),
            failures: vec![failure.clone(), failure],
        };
        let run = RunSnapshot {
            request: &req,
            category: &cat,
            table: &table,
            headers: &headers,
            mapping: &m,
            required_fields: &[],
            processing: &processing,
            persistence: &persistence,
        };
        let settings = ImportSettings {
            error_sample_limit: 1,
            ..Default::default()
        };

        let result = summarize(&run, &settings);
        assert_eq!(result.error_stats["duplicate sku"], 2);
        assert_eq!(result.failed_products, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.processing_status, ProcessingStatus::Partial);
    }

    #[test]
    fn test_template_from_selection_or_mapping() {
        let cat = category();
        let fields = vec![FieldDescriptor::new("sku").required(), FieldDescriptor::new("color")];

        let from_fields = template_from_run(&cat, Some(&fields), &mapping(MappingKind::Fallback))
            .expect("template from fields");
        assert_eq!(from_fields.field_mappings.as_array().map(|a| a.len()), Some(2));
        assert_eq!(from_fields.required_fields.as_array().map(|a| a.len()), Some(1));

        assert!(template_from_run(&cat, None, &mapping(MappingKind::Explicit)).is_some());
        assert!(template_from_run(&cat, None, &mapping(MappingKind::Fallback)).is_none());
        assert!(template_from_run(&cat, None, &mapping(MappingKind::Template)).is_none());
    }
}
