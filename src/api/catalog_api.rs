// ==========================================
// Catalog import - catalog API
// ==========================================
// Responsibility: category lookup / creation and import-template
// listing / upsert / export
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::catalog::{CatalogCategory, ImportTemplate, NewCategory, TemplateUpsert};
use crate::repository::{CategoryRepository, TemplateRepository};
use chrono::Utc;
use csv::WriterBuilder;
use std::sync::Arc;
use tracing::info;

/// Blank rows written under the header row of an exported template
pub const EXPORT_BLANK_ROWS: usize = 5;

/// Content type of an exported template
pub const EXPORT_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

// Semicolon: list separator of ru-locale spreadsheet apps
const EXPORT_DELIMITER: u8 = b';';

/// Fill-in sheet generated from a template
#[derive(Debug, Clone)]
pub struct TemplateExport {
    pub file_name: String,
    pub headers: Vec<String>,
    pub bytes: Vec<u8>,
}

pub struct CatalogApi {
    category_repo: Arc<dyn CategoryRepository>,
    template_repo: Arc<dyn TemplateRepository>,
}

impl CatalogApi {
    pub fn new(
        category_repo: Arc<dyn CategoryRepository>,
        template_repo: Arc<dyn TemplateRepository>,
    ) -> Self {
        Self {
            category_repo,
            template_repo,
        }
    }

    pub async fn get_category(&self, id: &str) -> ApiResult<CatalogCategory> {
        self.category_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("catalog category (id={})", id)))
    }

    pub async fn create_category(&self, input: NewCategory) -> ApiResult<CatalogCategory> {
        let category = self.category_repo.create(input).await?;
        info!(category_id = %category.id, level = category.level, "category created");
        Ok(category)
    }

    /// Templates, optionally filtered by category
    pub async fn list_templates(&self, category_id: Option<&str>) -> ApiResult<Vec<ImportTemplate>> {
        let category_id = category_id.map(str::trim).filter(|c| !c.is_empty());
        Ok(self.template_repo.list(category_id).await?)
    }

    /// Create the category's template, or update it in place
    ///
    /// # Errors
    /// - InvalidInput: name or category id missing
    /// - NotFound: unknown category
    pub async fn upsert_template(&self, input: TemplateUpsert) -> ApiResult<ImportTemplate> {
        if input.name.trim().is_empty() || input.catalog_category_id.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "required fields missing: name, catalog_category_id".to_string(),
            ));
        }
        self.get_category(&input.catalog_category_id).await?;

        let template = self.template_repo.upsert(&input).await?;
        info!(template_id = %template.id, category_id = %template.catalog_category_id, "template saved");
        Ok(template)
    }

    /// Build the fill-in CSV of a template, picked by id or by category
    ///
    /// # Errors
    /// - InvalidInput: neither id given, or the template has no fields
    /// - NotFound: no matching template
    pub async fn export_template(
        &self,
        template_id: Option<&str>,
        category_id: Option<&str>,
    ) -> ApiResult<TemplateExport> {
        let template_id = template_id.map(str::trim).filter(|id| !id.is_empty());
        let category_id = category_id.map(str::trim).filter(|id| !id.is_empty());

        let template = match (template_id, category_id) {
            (Some(id), _) => self.template_repo.find_by_id(id).await?,
            (None, Some(category_id)) => self.template_repo.find_first_by_category(category_id).await?,
            (None, None) => {
                return Err(ApiError::InvalidInput(
                    "templateId or categoryId is required".to_string(),
                ))
            }
        }
        .ok_or_else(|| ApiError::NotFound("import template".to_string()))?;

        let headers = template.export_headers();
        if headers.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "template {} has no fields to export",
                template.id
            )));
        }

        let bytes = render_template_csv(&headers)?;
        let file_name = format!(
            "template_{}_{}.csv",
            file_name_token(&template.catalog_category_id),
            Utc::now().format("%Y-%m-%d")
        );
        info!(template_id = %template.id, columns = headers.len(), "template exported");

        Ok(TemplateExport {
            file_name,
            headers,
            bytes,
        })
    }
}

/// Header row plus blank rows, UTF-8 with BOM
fn render_template_csv(headers: &[String]) -> ApiResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(EXPORT_DELIMITER)
        .from_writer(Vec::new());

    let csv_err = |e: csv::Error| ApiError::InternalError(format!("template CSV write failed: {}", e));
    writer.write_record(headers).map_err(csv_err)?;
    let blank = vec![""; headers.len()];
    for _ in 0..EXPORT_BLANK_ROWS {
        writer.write_record(&blank).map_err(csv_err)?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| ApiError::InternalError(format!("template CSV flush failed: {}", e)))?;

    let mut bytes = Vec::with_capacity(body.len() + 3);
    bytes.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Keep a file name ASCII-safe for the Content-Disposition header
fn file_name_token(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template_csv_quotes_and_pads() {
        let headers = vec!["Ширина; мм".to_string(), "Цена".to_string()];
        let bytes = render_template_csv(&headers).unwrap();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));

        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\"Ширина; мм\";Цена");
        assert_eq!(lines.len(), 1 + EXPORT_BLANK_ROWS);
        assert!(lines[1..].iter().all(|l| *l == ";"));
    }

    #[test]
    fn test_file_name_token_replaces_unsafe_chars() {
        assert_eq!(file_name_token("c-1/двери x"), "c-1_______x");
    }
}
