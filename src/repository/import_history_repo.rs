// ==========================================
// Catalog import - import history & statistics repository
// ==========================================
// Responsibility: append-only import_history log and per-category
// aggregate counters (import_stats)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::{ImportHistoryEntry, ImportStats};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Default number of entries returned by `list_recent`
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

// ==========================================
// ImportHistoryRepository Trait
// ==========================================
#[async_trait]
pub trait ImportHistoryRepository: Send + Sync {
    /// Append one history entry (id and timestamp assigned here)
    async fn append(
        &self,
        category: &str,
        filename: &str,
        products_count: i64,
        status: &str,
    ) -> RepositoryResult<ImportHistoryEntry>;

    /// Newest entries first
    async fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportHistoryEntry>>;

    /// Add one run to the category's aggregate counters
    async fn record_import(&self, category_id: &str, products_saved: i64) -> RepositoryResult<()>;

    async fn get_stats(&self, category_id: &str) -> RepositoryResult<Option<ImportStats>>;
}

// ==========================================
// ImportHistoryRepositoryImpl
// ==========================================
pub struct ImportHistoryRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportHistoryRepositoryImpl {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS import_history (
              id TEXT PRIMARY KEY,
              category TEXT NOT NULL,
              filename TEXT NOT NULL,
              products_count INTEGER NOT NULL DEFAULT 0,
              status TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_import_history_created_at
              ON import_history(created_at DESC);

            CREATE TABLE IF NOT EXISTS import_stats (
              catalog_category_id TEXT PRIMARY KEY,
              imports_total INTEGER NOT NULL DEFAULT 0,
              products_imported_total INTEGER NOT NULL DEFAULT 0,
              last_import_at TEXT
            );
            "#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl ImportHistoryRepository for ImportHistoryRepositoryImpl {
    async fn append(
        &self,
        category: &str,
        filename: &str,
        products_count: i64,
        status: &str,
    ) -> RepositoryResult<ImportHistoryEntry> {
        let entry = ImportHistoryEntry {
            id: Uuid::new_v4().to_string(),
            category: category.to_string(),
            filename: filename.to_string(),
            products_count,
            status: status.to_string(),
            created_at: Utc::now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_history (id, category, filename, products_count, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.id,
                entry.category,
                entry.filename,
                entry.products_count,
                entry.status,
                entry.created_at,
            ],
        )?;
        Ok(entry)
    }

    async fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportHistoryEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, category, filename, products_count, status, created_at
            FROM import_history
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;
        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(ImportHistoryEntry {
                    id: row.get(0)?,
                    category: row.get(1)?,
                    filename: row.get(2)?,
                    products_count: row.get(3)?,
                    status: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn record_import(&self, category_id: &str, products_saved: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_stats (catalog_category_id, imports_total, products_imported_total, last_import_at)
            VALUES (?1, 1, ?2, ?3)
            ON CONFLICT(catalog_category_id) DO UPDATE SET
                imports_total = imports_total + 1,
                products_imported_total = products_imported_total + excluded.products_imported_total,
                last_import_at = excluded.last_import_at
            "#,
            params![category_id, products_saved, Utc::now()],
        )?;
        Ok(())
    }

    async fn get_stats(&self, category_id: &str) -> RepositoryResult<Option<ImportStats>> {
        let conn = self.get_conn()?;
        let stats = conn
            .query_row(
                r#"
                SELECT catalog_category_id, imports_total, products_imported_total, last_import_at
                FROM import_stats WHERE catalog_category_id = ?1
                "#,
                params![category_id],
                |row| {
                    Ok(ImportStats {
                        catalog_category_id: row.get(0)?,
                        imports_total: row.get(1)?,
                        products_imported_total: row.get(2)?,
                        last_import_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(stats)
    }
}
