// ==========================================
// Catalog import - field mapping resolver
// ==========================================
// Responsibility: choose the header → field mapping of a run
// Priority (strict, no merging across sources):
//   user mapping > category import_mapping > template > identity fallback
// ==========================================

use crate::domain::catalog::{
    decode_field_list, CatalogCategory, FieldDescriptor, FieldMapping, ImportTemplate,
};
use crate::domain::import::{MappingEntry, ResolvedMapping};
use crate::domain::types::MappingKind;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::importer_trait::FieldMappingResolver as FieldMappingResolverTrait;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

pub struct FieldMappingResolver;

impl FieldMappingResolverTrait for FieldMappingResolver {
    fn resolve(
        &self,
        headers: &[String],
        category: &CatalogCategory,
        template: Option<&ImportTemplate>,
        user_mapping: Option<&[FieldMapping]>,
    ) -> ResolvedMapping {
        // 1. explicit user mapping
        if let Some(mapping) = user_mapping.filter(|m| !m.is_empty()) {
            debug!(entries = mapping.len(), "using explicit mapping");
            return ResolvedMapping {
                kind: MappingKind::Explicit,
                entries: mapping
                    .iter()
                    .map(|m| MappingEntry {
                        source_header: m.source_header.clone(),
                        target_field: m.field_name.clone(),
                    })
                    .collect(),
                property_override: None,
            };
        }

        // 2. category mapping
        if !category.import_mapping.is_empty() {
            debug!(entries = category.import_mapping.len(), "using category mapping");
            return ResolvedMapping {
                kind: MappingKind::Category,
                entries: category
                    .import_mapping
                    .iter()
                    .map(|(header, field)| MappingEntry {
                        source_header: header.clone(),
                        target_field: field.clone(),
                    })
                    .collect(),
                property_override: None,
            };
        }

        // 3. template field list
        if let Some(resolved) = template.and_then(|t| from_template(headers, t)) {
            debug!(entries = resolved.entries.len(), "using template mapping");
            return resolved;
        }

        // 4. identity fallback
        ResolvedMapping {
            kind: MappingKind::Fallback,
            entries: headers
                .iter()
                .map(|h| MappingEntry {
                    source_header: h.clone(),
                    target_field: h.clone(),
                })
                .collect(),
            property_override: None,
        }
    }
}

/// Template-derived mapping, or `None` when the template has no usable field list
fn from_template(headers: &[String], template: &ImportTemplate) -> Option<ResolvedMapping> {
    let required = decode_field_list(&template.required_fields);
    let (fields, all_required) = match decode_field_list(&template.field_mappings) {
        Some(list) => (list, false),
        None => (required.clone()?, true),
    };

    let required_names: HashSet<String> = required
        .unwrap_or_default()
        .into_iter()
        .map(|m| m.field_name)
        .collect();

    let descriptors: Vec<FieldDescriptor> = fields
        .iter()
        .map(|m| {
            let mut d = m.to_descriptor();
            d.is_required = d.is_required || all_required || required_names.contains(&d.field_name);
            d
        })
        .collect();

    let entries = headers
        .iter()
        .filter_map(|header| {
            fields
                .iter()
                .find(|m| !m.source_header.is_empty() && m.source_header.trim() == header.trim())
                .or_else(|| fields.iter().find(|m| m.to_descriptor().matches_header(header)))
                .map(|m| MappingEntry {
                    source_header: header.clone(),
                    target_field: m.field_name.clone(),
                })
        })
        .collect();

    Some(ResolvedMapping {
        kind: MappingKind::Template,
        entries,
        property_override: Some(descriptors),
    })
}

/// Parse the `mapping` request field
///
/// Accepts a JSON array of mapping objects or a `{ header: field }` object.
pub fn parse_user_mapping(raw: &str) -> ImporterResult<Vec<FieldMapping>> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(header, field)| match field {
                Value::String(f) => Some(FieldMapping::new(header, f)),
                _ => None,
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(ImportError::InvalidMapping(format!(
            "expected an array or object, got {}",
            other
        ))),
    }
}

/// Parse the `fields` request field: descriptor objects or bare field names
pub fn parse_field_selection(raw: &str) -> ImporterResult<Vec<FieldDescriptor>> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Array(items) = value else {
        return Err(ImportError::InvalidMapping("fields must be a JSON array".to_string()));
    };

    items
        .into_iter()
        .map(|item| -> ImporterResult<FieldDescriptor> {
            match item {
                Value::String(name) => Ok(FieldDescriptor::new(name).required()),
                other => Ok(serde_json::from_value(other)?),
            }
        })
        .collect()
}
