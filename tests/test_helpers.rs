// ==========================================
// Test helpers
// ==========================================
// Responsibility: temporary databases, wired stores, seed data
// ==========================================
#![allow(dead_code)]

use catalog_import::config::ConfigManager;
use catalog_import::db::{init_schema, open_sqlite_connection};
use catalog_import::domain::{CatalogCategory, FieldDescriptor, NewCategory};
use catalog_import::importer::CatalogImporterImpl;
use catalog_import::repository::{
    CategoryRepository, CategoryRepositoryImpl, ImportHistoryRepositoryImpl, ProductRepositoryImpl,
    TemplateRepositoryImpl,
};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Create a temporary database with the shared schema
///
/// # Returns
/// - NamedTempFile: temporary file (keep it alive for the test)
/// - String: database path
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// Every store over one shared connection
pub struct TestStores {
    pub conn: Arc<Mutex<Connection>>,
    pub category_repo: Arc<CategoryRepositoryImpl>,
    pub product_repo: Arc<ProductRepositoryImpl>,
    pub template_repo: Arc<TemplateRepositoryImpl>,
    pub history_repo: Arc<ImportHistoryRepositoryImpl>,
}

impl TestStores {
    pub fn open(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = Arc::new(Mutex::new(open_sqlite_connection(db_path)?));
        Ok(Self {
            category_repo: Arc::new(CategoryRepositoryImpl::from_connection(conn.clone())?),
            product_repo: Arc::new(ProductRepositoryImpl::from_connection(conn.clone())?),
            template_repo: Arc::new(TemplateRepositoryImpl::from_connection(conn.clone())?),
            history_repo: Arc::new(ImportHistoryRepositoryImpl::from_connection(conn.clone())?),
            conn,
        })
    }

    pub fn config(&self) -> ConfigManager {
        ConfigManager::from_connection(self.conn.clone()).expect("config manager")
    }

    /// Importer with the standard stages
    pub fn importer(&self) -> CatalogImporterImpl<ConfigManager> {
        CatalogImporterImpl::with_default_stages(
            self.config(),
            self.category_repo.clone(),
            self.template_repo.clone(),
            self.history_repo.clone(),
            self.product_repo.clone(),
        )
    }
}

/// Create a category with the given properties and header → field mapping
pub async fn seed_category(
    stores: &TestStores,
    name: &str,
    properties: Vec<FieldDescriptor>,
    import_mapping: &[(&str, &str)],
) -> CatalogCategory {
    let import_mapping: BTreeMap<String, String> = import_mapping
        .iter()
        .map(|(h, f)| (h.to_string(), f.to_string()))
        .collect();
    stores
        .category_repo
        .create(NewCategory {
            name: name.to_string(),
            properties,
            import_mapping,
            ..Default::default()
        })
        .await
        .expect("seed category")
}

/// CSV bytes from lines
pub fn csv_bytes(lines: &[&str]) -> Vec<u8> {
    let mut text = lines.join("\n");
    text.push('\n');
    text.into_bytes()
}
