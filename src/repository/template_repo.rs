// ==========================================
// Catalog import - import template repository
// ==========================================
// Responsibility: import_template rows, one per category
// Writes are upserts keyed by catalog_category_id, so repeated or
// concurrent auto-creation never produces duplicates
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::catalog::{ImportTemplate, TemplateUpsert};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// TemplateRepository Trait
// ==========================================
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// First template of a category (`Ok(None)` when absent)
    async fn find_first_by_category(&self, category_id: &str)
        -> RepositoryResult<Option<ImportTemplate>>;

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ImportTemplate>>;

    /// Templates, newest first, optionally filtered by category
    async fn list(&self, category_id: Option<&str>) -> RepositoryResult<Vec<ImportTemplate>>;

    /// Create, or update the category's existing template in place
    async fn upsert(&self, input: &TemplateUpsert) -> RepositoryResult<ImportTemplate>;

    /// Create only when the category has no template yet
    ///
    /// # Returns
    /// - Ok(true): a template was created
    /// - Ok(false): one already existed, nothing changed
    async fn create_if_absent(&self, input: &TemplateUpsert) -> RepositoryResult<bool>;
}

// ==========================================
// TemplateRepositoryImpl
// ==========================================
pub struct TemplateRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = "id, catalog_category_id, name, description, field_mappings, \
     required_fields, calculator_fields, export_fields, validation_rules, is_active, \
     created_at, updated_at";

/// Encode a JSON column; null becomes the column's empty value
fn encode_json(value: &Value, empty: &str) -> RepositoryResult<String> {
    if value.is_null() {
        return Ok(empty.to_string());
    }
    Ok(serde_json::to_string(value)?)
}

/// Decode a JSON column; text that is not JSON is kept as a string value
fn decode_json(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

impl TemplateRepositoryImpl {
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
            CREATE TABLE IF NOT EXISTS import_template (
              id TEXT PRIMARY KEY,
              catalog_category_id TEXT NOT NULL UNIQUE REFERENCES catalog_category(id),
              name TEXT NOT NULL,
              description TEXT,
              field_mappings TEXT NOT NULL DEFAULT '[]',
              required_fields TEXT NOT NULL DEFAULT '[]',
              calculator_fields TEXT NOT NULL DEFAULT '[]',
              export_fields TEXT NOT NULL DEFAULT '[]',
              validation_rules TEXT NOT NULL DEFAULT '{}',
              is_active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<ImportTemplate> {
        Ok(ImportTemplate {
            id: row.get(0)?,
            catalog_category_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            field_mappings: decode_json(row.get(4)?),
            required_fields: decode_json(row.get(5)?),
            calculator_fields: decode_json(row.get(6)?),
            export_fields: decode_json(row.get(7)?),
            validation_rules: decode_json(row.get(8)?),
            is_active: row.get::<_, i64>(9)? != 0,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn find_by_category_sync(
        conn: &Connection,
        category_id: &str,
    ) -> RepositoryResult<Option<ImportTemplate>> {
        let sql = format!(
            "SELECT {} FROM import_template WHERE catalog_category_id = ?1 \
             ORDER BY created_at LIMIT 1",
            SELECT_COLUMNS
        );
        Ok(conn.query_row(&sql, params![category_id], Self::map_row).optional()?)
    }

    /// Shared INSERT; `on_conflict` selects update-in-place or no-op
    fn insert(conn: &Connection, input: &TemplateUpsert, on_conflict: &str) -> RepositoryResult<usize> {
        if input.catalog_category_id.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "catalog_category_id is required".to_string(),
            ));
        }

        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO import_template (
                id, catalog_category_id, name, description, field_mappings, required_fields,
                calculator_fields, export_fields, validation_rules, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)
            ON CONFLICT(catalog_category_id) {}
            "#,
            on_conflict
        );
        let affected = conn.execute(
            &sql,
            params![
                Uuid::new_v4().to_string(),
                input.catalog_category_id,
                input.name,
                input.description,
                encode_json(&input.field_mappings, "[]")?,
                encode_json(&input.required_fields, "[]")?,
                encode_json(&input.calculator_fields, "[]")?,
                encode_json(&input.export_fields, "[]")?,
                encode_json(&input.validation_rules, "{}")?,
                now,
            ],
        )?;
        Ok(affected)
    }
}

#[async_trait]
impl TemplateRepository for TemplateRepositoryImpl {
    async fn find_first_by_category(
        &self,
        category_id: &str,
    ) -> RepositoryResult<Option<ImportTemplate>> {
        let conn = self.get_conn()?;
        Self::find_by_category_sync(&conn, category_id)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ImportTemplate>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM import_template WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }

    async fn list(&self, category_id: Option<&str>) -> RepositoryResult<Vec<ImportTemplate>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_template \
             WHERE (?1 IS NULL OR catalog_category_id = ?1) \
             ORDER BY created_at DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let templates = stmt
            .query_map(params![category_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    async fn upsert(&self, input: &TemplateUpsert) -> RepositoryResult<ImportTemplate> {
        let conn = self.get_conn()?;
        Self::insert(
            &conn,
            input,
            r#"DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                field_mappings = excluded.field_mappings,
                required_fields = excluded.required_fields,
                calculator_fields = excluded.calculator_fields,
                export_fields = excluded.export_fields,
                validation_rules = excluded.validation_rules,
                updated_at = excluded.updated_at"#,
        )?;

        Self::find_by_category_sync(&conn, &input.catalog_category_id)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "ImportTemplate".to_string(),
                id: input.catalog_category_id.clone(),
            }
        })
    }

    async fn create_if_absent(&self, input: &TemplateUpsert) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = Self::insert(&conn, input, "DO NOTHING")?;
        Ok(affected == 1)
    }
}
