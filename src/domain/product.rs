// ==========================================
// Catalog import - product domain model
// ==========================================
// The dynamic column set of an upload is not reified into relational
// columns: every mapped cell lives in the property bag
// ==========================================

use crate::domain::types::PropertyValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form key → value bag stored per product
pub type PropertyBag = BTreeMap<String, PropertyValue>;

// ==========================================
// Product - persisted catalog product
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sku: String,                    // unique
    pub name: String,
    pub catalog_category_id: String,
    pub base_price: f64,
    pub stock_quantity: i64,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub specifications: PropertyBag,
    pub properties_data: PropertyBag,   // same content as `specifications`
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully defaulted insert row produced by the persister
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub catalog_category_id: String,
    pub base_price: f64,
    pub stock_quantity: i64,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub properties: PropertyBag,
}

// ==========================================
// ProductDraft - accepted spreadsheet row, not yet persisted
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    pub row_number: usize,              // 1-based, offset by the header row
    pub sku: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub properties: PropertyBag,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
