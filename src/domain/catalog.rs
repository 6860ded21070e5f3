// ==========================================
// Catalog import - catalog domain model
// ==========================================
// Categories own an optional import mapping and a property list;
// import templates remember the field selection of earlier runs
// ==========================================

use crate::domain::types::DataType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// FieldDescriptor - target field of a mapping
// ==========================================
// Aliases accept the camelCase shapes produced by the admin UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(alias = "fieldName", alias = "key", alias = "name")]
    pub field_name: String,

    #[serde(default, alias = "displayName", alias = "label")]
    pub display_name: Option<String>,

    #[serde(default, alias = "dataType", alias = "type")]
    pub data_type: DataType,

    #[serde(default, alias = "isRequired", alias = "required")]
    pub is_required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl FieldDescriptor {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            display_name: None,
            data_type: DataType::Text,
            is_required: false,
            unit: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Whether a spreadsheet header names this field (by key or display name)
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim().to_lowercase();
        if self.field_name.trim().to_lowercase() == header {
            return true;
        }
        self.display_name
            .as_deref()
            .map(|d| d.trim().to_lowercase() == header)
            .unwrap_or(false)
    }
}

// ==========================================
// FieldMapping - spreadsheet header → target field
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default, alias = "sourceHeader", alias = "header", alias = "source")]
    pub source_header: String,

    #[serde(alias = "fieldName", alias = "target", alias = "targetField", alias = "key")]
    pub field_name: String,

    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,

    #[serde(default, alias = "dataType", alias = "type")]
    pub data_type: DataType,

    #[serde(default, alias = "isRequired", alias = "required")]
    pub is_required: bool,
}

impl FieldMapping {
    pub fn new(source_header: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            source_header: source_header.into(),
            field_name: field_name.into(),
            display_name: None,
            data_type: DataType::Text,
            is_required: false,
        }
    }

    pub fn to_descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            field_name: self.field_name.clone(),
            display_name: self
                .display_name
                .clone()
                .or_else(|| Some(self.source_header.clone()).filter(|s| !s.is_empty())),
            data_type: self.data_type,
            is_required: self.is_required,
            unit: None,
        }
    }
}

// ==========================================
// CatalogCategory - taxonomy tree node
// ==========================================
// `level` and `path` are derived from the parent chain on creation;
// `products_count` is a derived value refreshed by an explicit recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub level: i32,
    pub path: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub properties: Vec<FieldDescriptor>,    // property list (JSON column)
    pub import_mapping: BTreeMap<String, String>, // header → field
    pub products_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogCategory {
    /// Field names of properties flagged as required
    pub fn required_properties(&self) -> Vec<FieldDescriptor> {
        self.properties.iter().filter(|p| p.is_required).cloned().collect()
    }
}

/// Input for creating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub properties: Vec<FieldDescriptor>,
    #[serde(default)]
    pub import_mapping: BTreeMap<String, String>,
}

/// Derive `(level, path)` of a node from its parent
///
/// A root has level 0 and an empty path; a child sits one level below its
/// parent and its path is the parent's path extended with the parent id.
pub fn derive_tree_position(parent: Option<&CatalogCategory>) -> (i32, String) {
    match parent {
        None => (0, String::new()),
        Some(p) if p.path.is_empty() => (p.level + 1, p.id.clone()),
        Some(p) => (p.level + 1, format!("{}/{}", p.path, p.id)),
    }
}

// ==========================================
// ImportTemplate - remembered field selection of a category
// ==========================================
// Field lists are kept as raw JSON: stored rows written by other tools may
// hold either a structured list or a JSON-encoded string. Consumers decode
// them through `decode_field_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportTemplate {
    pub id: String,
    pub catalog_category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub field_mappings: serde_json::Value,
    pub required_fields: serde_json::Value,
    pub calculator_fields: serde_json::Value,
    pub export_fields: serde_json::Value,
    pub validation_rules: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportTemplate {
    /// Column headers of the fill-in sheet built from this template
    ///
    /// Required, calculator and export fields in that order. Items may be
    /// bare strings or field objects (display name, else field name); a
    /// list that fails to decode contributes nothing.
    pub fn export_headers(&self) -> Vec<String> {
        [&self.required_fields, &self.calculator_fields, &self.export_fields]
            .into_iter()
            .flat_map(raw_field_items)
            .filter_map(|item| field_label(&item))
            .collect()
    }
}

/// Items of a stored field list (array or JSON-encoded array)
fn raw_field_items(raw: &serde_json::Value) -> Vec<serde_json::Value> {
    match raw {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::String(s) => match serde_json::from_str(s) {
            Ok(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn field_label(item: &serde_json::Value) -> Option<String> {
    let label = match item {
        serde_json::Value::String(s) => Some(s.as_str()),
        serde_json::Value::Object(obj) => ["displayName", "display_name", "fieldName", "field_name"]
            .iter()
            .filter_map(|key| obj.get(*key).and_then(|v| v.as_str()))
            .find(|s| !s.trim().is_empty()),
        _ => None,
    }?;
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}

/// Input for creating or updating a template (keyed by category)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateUpsert {
    pub catalog_category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub field_mappings: serde_json::Value,
    #[serde(default)]
    pub required_fields: serde_json::Value,
    #[serde(default)]
    pub calculator_fields: serde_json::Value,
    #[serde(default)]
    pub export_fields: serde_json::Value,
    #[serde(default)]
    pub validation_rules: serde_json::Value,
}

/// Decode a template field list delivered as an array or a JSON string
///
/// Returns `None` when the value is absent, not a list, fails to decode,
/// or decodes to an empty list.
pub fn decode_field_list(raw: &serde_json::Value) -> Option<Vec<FieldMapping>> {
    let items = match raw {
        serde_json::Value::Array(_) => serde_json::from_value::<Vec<FieldMapping>>(raw.clone()).ok()?,
        serde_json::Value::String(s) => {
            let inner: serde_json::Value = serde_json::from_str(s).ok()?;
            if !inner.is_array() {
                return None;
            }
            serde_json::from_value::<Vec<FieldMapping>>(inner).ok()?
        }
        _ => return None,
    };

    let items: Vec<FieldMapping> = items
        .into_iter()
        .filter(|m| !m.field_name.trim().is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
