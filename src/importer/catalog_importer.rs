// ==========================================
// Catalog import - pipeline orchestrator
// ==========================================
// Responsibility: run the stages of one upload end to end
// Flow (headers): read → sanitize → infer
// Flow (full): lookup → read → sanitize → infer → resolve → process
//              → persist → summarize → follow-up writes
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::catalog::{FieldDescriptor, ImportTemplate};
use crate::domain::import::{HeadersProbe, ImportRequest, ImportResult, SanitizedHeaders, SpreadsheetTable};
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::importer_trait::{
    CatalogImporter, FieldMappingResolver, HeaderSanitizer, ImportPersister, RowProcessor,
    SchemaInferencer, SpreadsheetReader,
};
use crate::importer::reporter::{summarize, template_from_run, ImportReporter, RunSnapshot};
use crate::importer::row_processor::RowContext;
use crate::importer::{
    FieldMappingResolverImpl, HeaderSanitizerImpl, ImportPersisterImpl, RowProcessorImpl,
    SchemaInferencerImpl, UniversalSpreadsheetReader,
};
use crate::repository::{
    CategoryRepository, ImportHistoryRepository, ProductRepository, TemplateRepository,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

// ==========================================
// CatalogImporterImpl
// ==========================================
pub struct CatalogImporterImpl<C>
where
    C: ImportConfigReader,
{
    // Configuration reader
    config: C,

    // Stores
    category_repo: Arc<dyn CategoryRepository>,
    template_repo: Arc<dyn TemplateRepository>,

    // Stages
    reader: Box<dyn SpreadsheetReader>,
    sanitizer: Box<dyn HeaderSanitizer>,
    inferencer: Box<dyn SchemaInferencer>,
    resolver: Box<dyn FieldMappingResolver>,
    processor: Box<dyn RowProcessor>,
    persister: Box<dyn ImportPersister>,
    reporter: ImportReporter,
}

impl<C> CatalogImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// Create an importer from explicit stages
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: C,
        category_repo: Arc<dyn CategoryRepository>,
        template_repo: Arc<dyn TemplateRepository>,
        reader: Box<dyn SpreadsheetReader>,
        sanitizer: Box<dyn HeaderSanitizer>,
        inferencer: Box<dyn SchemaInferencer>,
        resolver: Box<dyn FieldMappingResolver>,
        processor: Box<dyn RowProcessor>,
        persister: Box<dyn ImportPersister>,
        reporter: ImportReporter,
    ) -> Self {
        Self {
            config,
            category_repo,
            template_repo,
            reader,
            sanitizer,
            inferencer,
            resolver,
            processor,
            persister,
            reporter,
        }
    }

    /// Create an importer with the standard stages over the given stores
    pub fn with_default_stages(
        config: C,
        category_repo: Arc<dyn CategoryRepository>,
        template_repo: Arc<dyn TemplateRepository>,
        history_repo: Arc<dyn ImportHistoryRepository>,
        product_repo: Arc<dyn ProductRepository>,
    ) -> Self {
        let reporter = ImportReporter::new(
            category_repo.clone(),
            template_repo.clone(),
            history_repo,
        );
        Self::new(
            config,
            category_repo,
            template_repo,
            Box::new(UniversalSpreadsheetReader),
            Box::new(HeaderSanitizerImpl),
            Box::new(SchemaInferencerImpl),
            Box::new(FieldMappingResolverImpl),
            Box::new(RowProcessorImpl),
            Box::new(ImportPersisterImpl::new(product_repo)),
            reporter,
        )
    }

    /// Read the upload and sanitize its header row
    fn read_table(&self, request: &ImportRequest) -> ImporterResult<(SpreadsheetTable, SanitizedHeaders)> {
        let table = self.reader.read(
            &request.bytes,
            &request.file_name,
            request.mime_type.as_deref(),
        )?;

        let headers = self.sanitizer.sanitize(&table.headers);
        if headers.is_empty() {
            return Err(ImportError::UnreadableFile {
                attempts: vec![format!("{}: header row has no usable cells", table.strategy)],
            });
        }
        Ok((table, headers))
    }

    /// Template of the run: the requested one when it belongs to the
    /// category, otherwise the category's first template
    async fn select_template(
        &self,
        category_id: &str,
        template_id: Option<&str>,
    ) -> ImporterResult<Option<ImportTemplate>> {
        if let Some(id) = template_id.filter(|id| !id.trim().is_empty()) {
            match self.template_repo.find_by_id(id).await? {
                Some(template) if template.catalog_category_id == category_id => {
                    return Ok(Some(template));
                }
                Some(_) => warn!(template_id = id, category_id, "template belongs to another category, ignored"),
                None => warn!(template_id = id, "requested template not found, ignored"),
            }
        }
        Ok(self.template_repo.find_first_by_category(category_id).await?)
    }
}

#[async_trait::async_trait]
impl<C> CatalogImporter for CatalogImporterImpl<C>
where
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, request), fields(file_name = %request.file_name))]
    async fn probe_headers(&self, request: &ImportRequest) -> ImporterResult<HeadersProbe> {
        let settings = self.config.load_settings().await;

        let (table, headers) = self.read_table(request)?;
        let sample_end = table.rows.len().min(settings.sample_rows);
        let schema = self.inferencer.infer(&headers, &table.rows[..sample_end]);

        let count = headers.len().to_string();
        info!(columns = headers.len(), rows = table.rows.len(), "headers probed");

        Ok(HeadersProbe {
            ok: true,
            message: t_with_args("import.headers_read", &[("count", count.as_str())]),
            headers: headers.names,
            schema: schema.columns,
            header_keys: schema.header_keys,
            total_rows: table.rows.len(),
            sheet_name: table.sheet_name,
        })
    }

    #[instrument(skip(self, request), fields(category_id = %request.category_id, file_name = %request.file_name))]
    async fn import_full(&self, request: &ImportRequest) -> ImporterResult<ImportResult> {
        let start_time = Instant::now();

        // === Step 1: category ===
        let category = self
            .category_repo
            .find_by_id(&request.category_id)
            .await?
            .ok_or_else(|| ImportError::CategoryNotFound(request.category_id.clone()))?;
        let settings = self.config.load_settings().await;

        // === Step 2: read + sanitize ===
        let (table, headers) = self.read_table(request)?;
        info!(
            rows = table.rows.len(),
            columns = headers.len(),
            strategy = %table.strategy,
            "file read"
        );

        // === Step 3: schema of the sample rows ===
        let sample_end = table.rows.len().min(settings.sample_rows);
        let schema = self.inferencer.infer(&headers, &table.rows[..sample_end]);

        // === Step 4: mapping ===
        let template = self
            .select_template(&category.id, request.template_id.as_deref())
            .await?;
        let mapping = self.resolver.resolve(
            &headers.names,
            &category,
            template.as_ref(),
            request.user_mapping.as_deref(),
        );
        debug!(kind = ?mapping.kind, entries = mapping.entries.len(), "mapping resolved");

        // Template descriptors replace the property list of this run only
        let mut working = category.clone();
        if let Some(descriptors) = &mapping.property_override {
            working.properties = descriptors.clone();
        }

        let required_fields: Vec<FieldDescriptor> = match request.selected_fields.as_deref() {
            Some(fields) if !fields.is_empty() => {
                fields.iter().filter(|f| f.is_required).cloned().collect()
            }
            _ => working.required_properties(),
        };

        // === Step 5: rows ===
        let ctx = RowContext {
            headers: &headers,
            mapping: &mapping,
            required_fields: &required_fields,
            schema: Some(&schema),
            rename_to_target_field: settings.rename_to_target_field,
        };
        let processing = self.processor.process(&table, &ctx);

        // === Step 6: persistence ===
        let persistence = self.persister.persist(&category.id, &processing.accepted).await;

        // === Step 7: summary ===
        let result = summarize(
            &RunSnapshot {
                request,
                category: &working,
                table: &table,
                headers: &headers,
                mapping: &mapping,
                required_fields: &required_fields,
                processing: &processing,
                persistence: &persistence,
            },
            &settings,
        );

        // === Step 8: follow-up writes ===
        let auto_template = if settings.auto_create_template && template.is_none() {
            template_from_run(&category, request.selected_fields.as_deref(), &mapping)
        } else {
            None
        };
        self.reporter.record(&result, auto_template).await;

        info!(
            total_rows = result.total_rows,
            imported = result.imported,
            saved = result.database_saved,
            rejected = result.error_rows,
            failed = result.failed_products,
            status = %result.processing_status,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "import finished"
        );
        Ok(result)
    }
}
