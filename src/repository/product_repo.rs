// ==========================================
// Catalog import - product repository
// ==========================================
// Responsibility: product rows; each create is a single atomic INSERT
// Storage: the property bag is written to both `specifications` and
// `properties_data`
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::product::{NewProduct, Product, PropertyBag};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// ProductRepository Trait
// ==========================================
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert one product
    ///
    /// # Errors
    /// - UniqueConstraintViolation: sku already exists
    /// - ForeignKeyViolation: category does not exist
    async fn create(&self, product: &NewProduct) -> RepositoryResult<Product>;

    async fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>>;

    async fn list_by_category(&self, category_id: &str) -> RepositoryResult<Vec<Product>>;
}

// ==========================================
// ProductRepositoryImpl
// ==========================================
pub struct ProductRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = "id, sku, name, catalog_category_id, base_price, stock_quantity, \
     brand, model, description, specifications, properties_data, is_active, created_at, updated_at";

impl ProductRepositoryImpl {
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
            CREATE TABLE IF NOT EXISTS product (
              id TEXT PRIMARY KEY,
              sku TEXT NOT NULL UNIQUE,
              name TEXT NOT NULL,
              catalog_category_id TEXT NOT NULL REFERENCES catalog_category(id),
              base_price REAL NOT NULL DEFAULT 0,
              stock_quantity INTEGER NOT NULL DEFAULT 0,
              brand TEXT,
              model TEXT,
              description TEXT,
              specifications TEXT NOT NULL DEFAULT '{}',
              properties_data TEXT NOT NULL DEFAULT '{}',
              is_active INTEGER NOT NULL DEFAULT 1,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_product_category
              ON product(catalog_category_id);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<Product> {
        let specifications: String = row.get(9)?;
        let properties_data: String = row.get(10)?;

        Ok(Product {
            id: row.get(0)?,
            sku: row.get(1)?,
            name: row.get(2)?,
            catalog_category_id: row.get(3)?,
            base_price: row.get(4)?,
            stock_quantity: row.get(5)?,
            brand: row.get(6)?,
            model: row.get(7)?,
            description: row.get(8)?,
            specifications: serde_json::from_str::<PropertyBag>(&specifications).unwrap_or_default(),
            properties_data: serde_json::from_str::<PropertyBag>(&properties_data).unwrap_or_default(),
            is_active: row.get::<_, i64>(11)? != 0,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

#[async_trait]
impl ProductRepository for ProductRepositoryImpl {
    async fn create(&self, product: &NewProduct) -> RepositoryResult<Product> {
        let bag = serde_json::to_string(&product.properties)?;
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product (
                id, sku, name, catalog_category_id, base_price, stock_quantity,
                brand, model, description, specifications, properties_data,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, 1, ?11, ?11)
            "#,
            params![
                id,
                product.sku,
                product.name,
                product.catalog_category_id,
                product.base_price,
                product.stock_quantity,
                product.brand,
                product.model,
                product.description,
                bag,
                now,
            ],
        )?;

        Ok(Product {
            id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            catalog_category_id: product.catalog_category_id.clone(),
            base_price: product.base_price,
            stock_quantity: product.stock_quantity,
            brand: product.brand.clone(),
            model: product.model.clone(),
            description: product.description.clone(),
            specifications: product.properties.clone(),
            properties_data: product.properties.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM product WHERE sku = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![sku], Self::map_row).optional()?)
    }

    async fn list_by_category(&self, category_id: &str) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM product WHERE catalog_category_id = ?1 ORDER BY created_at, rowid",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params![category_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }
}
