// ==========================================
// Catalog import - application state
// ==========================================
// Responsibility: build the shared stores and API instances once per
// process
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{CatalogApi, ImportApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::CatalogImporterImpl;
use crate::repository::{
    CategoryRepositoryImpl, ImportHistoryRepositoryImpl, ProductRepositoryImpl, RepositoryResult,
    TemplateRepositoryImpl,
};

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "CATALOG_IMPORT_DB_PATH";

/// Application state
///
/// Every store shares one SQLite connection.
#[derive(Clone)]
pub struct AppState {
    /// Database path
    pub db_path: String,

    /// Upload dispatch and import history
    pub import_api: Arc<ImportApi>,

    /// Categories and import templates
    pub catalog_api: Arc<CatalogApi>,
}

impl AppState {
    /// Open the database and wire every layer
    ///
    /// # Arguments
    /// - db_path: database file path (`:memory:` works for tests)
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        tracing::info!(db_path, "initializing application state");

        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Stores
        // ==========================================
        let category_repo = Arc::new(CategoryRepositoryImpl::from_connection(conn.clone())?);
        let product_repo = Arc::new(ProductRepositoryImpl::from_connection(conn.clone())?);
        let template_repo = Arc::new(TemplateRepositoryImpl::from_connection(conn.clone())?);
        let history_repo = Arc::new(ImportHistoryRepositoryImpl::from_connection(conn.clone())?);
        let config = ConfigManager::from_connection(conn)?;

        // ==========================================
        // Importer + APIs
        // ==========================================
        let importer = Arc::new(CatalogImporterImpl::with_default_stages(
            config,
            category_repo.clone(),
            template_repo.clone(),
            history_repo.clone(),
            product_repo,
        ));

        Ok(Self {
            db_path: db_path.to_string(),
            import_api: Arc::new(ImportApi::new(importer, history_repo)),
            catalog_api: Arc::new(CatalogApi::new(category_repo, template_repo)),
        })
    }
}

/// Default database path
///
/// Order: `CATALOG_IMPORT_DB_PATH`, then the user data directory, then
/// `./catalog_import.db`.
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog_import.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-import");
        // best-effort: on failure the fallback path in the working directory is used
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog_import.db");
        }
    }

    path.to_string_lossy().to_string()
}
