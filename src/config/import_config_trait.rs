// ==========================================
// Catalog import - import configuration reader trait
// ==========================================
// Responsibility: configuration the import pipeline reads (no writes,
// no business logic)
// ==========================================

use crate::importer::error::ImporterResult;
use async_trait::async_trait;
use tracing::warn;

/// Effective import settings of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub preview_limit: usize,
    pub sample_rows: usize,
    pub rename_to_target_field: bool,
    pub auto_create_template: bool,
    pub error_sample_limit: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            preview_limit: 10,
            sample_rows: 10,
            rename_to_target_field: false,
            auto_create_template: true,
            error_sample_limit: 20,
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// Implementor: ConfigManager (config_kv table)
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// Accepted rows echoed back in a result preview
    ///
    /// # Default
    /// - 10
    async fn get_preview_limit(&self) -> ImporterResult<usize>;

    /// Data rows fed to schema inference
    ///
    /// # Default
    /// - 10
    async fn get_sample_rows(&self) -> ImporterResult<usize>;

    /// Key property bags by resolved target field instead of header text
    ///
    /// # Default
    /// - false
    async fn get_rename_to_target_field(&self) -> ImporterResult<bool>;

    /// Create a template after a full run when the category has none
    ///
    /// # Default
    /// - true
    async fn get_auto_create_template(&self) -> ImporterResult<bool>;

    /// Itemised row errors echoed back in a result
    ///
    /// # Default
    /// - 20
    async fn get_error_sample_limit(&self) -> ImporterResult<usize>;

    /// Read every setting; a failing read falls back to its default
    async fn load_settings(&self) -> ImportSettings {
        let defaults = ImportSettings::default();

        macro_rules! read_or_default {
            ($getter:ident, $field:ident) => {
                match self.$getter().await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, setting = stringify!($field), "config read failed, using default");
                        defaults.$field
                    }
                }
            };
        }

        ImportSettings {
            preview_limit: read_or_default!(get_preview_limit, preview_limit),
            sample_rows: read_or_default!(get_sample_rows, sample_rows),
            rename_to_target_field: read_or_default!(get_rename_to_target_field, rename_to_target_field),
            auto_create_template: read_or_default!(get_auto_create_template, auto_create_template),
            error_sample_limit: read_or_default!(get_error_sample_limit, error_sample_limit),
        }
    }
}
