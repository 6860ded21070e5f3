// ==========================================
// Catalog import - category repository
// ==========================================
// Responsibility: catalog_category reads, creation with derived
// tree position, product-count recompute
// Rule: products_count is a derived value, refreshed only by an
// explicit recompute call
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::catalog::{derive_tree_position, CatalogCategory, FieldDescriptor, NewCategory};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// CategoryRepository Trait
// ==========================================
// Implementor: CategoryRepositoryImpl (rusqlite)
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a category; level and path are derived from the parent
    async fn create(&self, input: NewCategory) -> RepositoryResult<CatalogCategory>;

    /// Look up a category (`Ok(None)` when absent)
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<CatalogCategory>>;

    /// Replace the stored header → field import mapping
    async fn update_import_mapping(
        &self,
        id: &str,
        mapping: &BTreeMap<String, String>,
    ) -> RepositoryResult<()>;

    /// Recount active products of a category and store the result
    ///
    /// Idempotent; returns the new count.
    async fn recompute_product_count(&self, id: &str) -> RepositoryResult<i64>;
}

// ==========================================
// CategoryRepositoryImpl
// ==========================================
pub struct CategoryRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = "id, name, parent_id, level, path, sort_order, is_active, \
     properties, import_mapping, products_count, created_at, updated_at";

impl CategoryRepositoryImpl {
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
            CREATE TABLE IF NOT EXISTS catalog_category (
              id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              parent_id TEXT REFERENCES catalog_category(id),
              level INTEGER NOT NULL DEFAULT 0,
              path TEXT NOT NULL DEFAULT '',
              sort_order INTEGER NOT NULL DEFAULT 0,
              is_active INTEGER NOT NULL DEFAULT 1,
              properties TEXT NOT NULL DEFAULT '[]',
              import_mapping TEXT NOT NULL DEFAULT '{}',
              products_count INTEGER NOT NULL DEFAULT 0,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_category_parent
              ON catalog_category(parent_id);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<CatalogCategory> {
        // Malformed JSON columns read as empty rather than failing the lookup
        let properties: String = row.get(7)?;
        let import_mapping: String = row.get(8)?;

        Ok(CatalogCategory {
            id: row.get(0)?,
            name: row.get(1)?,
            parent_id: row.get(2)?,
            level: row.get(3)?,
            path: row.get(4)?,
            sort_order: row.get(5)?,
            is_active: row.get::<_, i64>(6)? != 0,
            properties: serde_json::from_str::<Vec<FieldDescriptor>>(&properties).unwrap_or_default(),
            import_mapping: serde_json::from_str::<BTreeMap<String, String>>(&import_mapping)
                .unwrap_or_default(),
            products_count: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn find_by_id_sync(conn: &Connection, id: &str) -> RepositoryResult<Option<CatalogCategory>> {
        let sql = format!("SELECT {} FROM catalog_category WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }
}

#[async_trait]
impl CategoryRepository for CategoryRepositoryImpl {
    async fn create(&self, input: NewCategory) -> RepositoryResult<CatalogCategory> {
        if input.name.trim().is_empty() {
            return Err(RepositoryError::ValidationError("category name is empty".to_string()));
        }

        let conn = self.get_conn()?;
        let parent = match input.parent_id.as_deref() {
            Some(pid) => Some(Self::find_by_id_sync(&conn, pid)?.ok_or_else(|| {
                RepositoryError::NotFound {
                    entity: "CatalogCategory".to_string(),
                    id: pid.to_string(),
                }
            })?),
            None => None,
        };
        let (level, path) = derive_tree_position(parent.as_ref());

        let now = Utc::now();
        let category = CatalogCategory {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            parent_id: input.parent_id,
            level,
            path,
            sort_order: input.sort_order,
            is_active: true,
            properties: input.properties,
            import_mapping: input.import_mapping,
            products_count: 0,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            r#"
            INSERT INTO catalog_category (
                id, name, parent_id, level, path, sort_order, is_active,
                properties, import_mapping, products_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, 0, ?9, ?10)
            "#,
            params![
                category.id,
                category.name,
                category.parent_id,
                category.level,
                category.path,
                category.sort_order,
                serde_json::to_string(&category.properties)?,
                serde_json::to_string(&category.import_mapping)?,
                category.created_at,
                category.updated_at,
            ],
        )?;

        Ok(category)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<CatalogCategory>> {
        let conn = self.get_conn()?;
        Self::find_by_id_sync(&conn, id)
    }

    async fn update_import_mapping(
        &self,
        id: &str,
        mapping: &BTreeMap<String, String>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE catalog_category SET import_mapping = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, serde_json::to_string(mapping)?, Utc::now()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "CatalogCategory".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn recompute_product_count(&self, id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM product WHERE catalog_category_id = ?1 AND is_active = 1",
            params![id],
            |row| row.get(0),
        )?;
        conn.execute(
            "UPDATE catalog_category SET products_count = ?2 WHERE id = ?1",
            params![id, count],
        )?;
        Ok(count)
    }
}
