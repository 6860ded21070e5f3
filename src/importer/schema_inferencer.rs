// ==========================================
// Catalog import - schema inferencer
// ==========================================
// Responsibility: per-column semantic type, required heuristic and unit
// from the header text and a sample of data rows
// Rule order (first match wins): number → boolean → url → select → text
// ==========================================

use crate::domain::import::{ColumnSchema, InferredSchema, SanitizedHeaders};
use crate::domain::types::{CellValue, DataType};
use crate::importer::importer_trait::SchemaInferencer as SchemaInferencerTrait;
use std::collections::HashSet;

/// Maximum non-empty samples considered per column
pub const MAX_SAMPLES: usize = 10;

/// Boolean tokens (compared trimmed, lowercase)
const BOOLEAN_TOKENS: [&str; 7] = ["да", "нет", "true", "false", "1", "0", "да/нет"];

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Identity / pricing keywords marking a column as required
const REQUIRED_KEYWORDS: [&str; 12] = [
    "название", "наименование", "name", "модель", "model", "артикул", "sku", "article",
    "цена", "price", "стоимость", "cost",
];

const DIMENSION_KEYWORDS: [&str; 8] = [
    "ширина", "высота", "толщина", "width", "height", "thickness", "мм", "mm",
];

const PRICE_KEYWORDS: [&str; 4] = ["цена", "стоимость", "price", "cost"];

pub const UNIT_MM: &str = "mm";
pub const UNIT_CURRENCY: &str = "₽";

pub struct SchemaInferencer;

impl SchemaInferencerTrait for SchemaInferencer {
    fn infer(&self, headers: &SanitizedHeaders, sample_rows: &[Vec<CellValue>]) -> InferredSchema {
        let mut schema = InferredSchema::default();

        for (position, (name, source_idx)) in headers
            .names
            .iter()
            .zip(headers.source_indices.iter())
            .enumerate()
        {
            let samples: Vec<&CellValue> = sample_rows
                .iter()
                .filter_map(|row| row.get(*source_idx))
                .filter(|c| !c.is_blank())
                .take(MAX_SAMPLES)
                .collect();

            let key = format!("field_{}", position + 1);
            schema.header_keys.insert(name.clone(), key.clone());
            schema.columns.push(ColumnSchema {
                key,
                display_name: name.clone(),
                data_type: infer_type(&samples),
                required: is_required_header(name),
                unit: infer_unit(name),
            });
        }

        schema
    }
}

/// Whole-value numeric parse after trimming
pub fn parses_as_number(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(n) => n.is_finite(),
        CellValue::Text(s) => s.trim().parse::<f64>().map(|n| n.is_finite()).unwrap_or(false),
        _ => false,
    }
}

pub fn is_boolean_token(cell: &CellValue) -> bool {
    match cell {
        CellValue::Bool(_) => true,
        CellValue::Number(n) => *n == 0.0 || *n == 1.0,
        CellValue::Text(s) => BOOLEAN_TOKENS.contains(&s.trim().to_lowercase().as_str()),
        CellValue::Empty => false,
    }
}

fn is_image_url(cell: &CellValue) -> bool {
    let CellValue::Text(s) = cell else {
        return false;
    };
    let lower = s.trim().to_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn infer_type(samples: &[&CellValue]) -> DataType {
    if samples.is_empty() {
        return DataType::Text;
    }
    if samples.iter().all(|c| parses_as_number(c)) {
        return DataType::Number;
    }
    if samples.iter().all(|c| is_boolean_token(c)) {
        return DataType::Boolean;
    }
    if samples.iter().all(|c| is_image_url(c)) {
        return DataType::Url;
    }

    let distinct: HashSet<String> = samples
        .iter()
        .filter_map(|c| c.as_text())
        .map(|s| s.trim().to_string())
        .collect();
    let threshold = f64::min(10.0, 0.5 * samples.len() as f64);
    if (distinct.len() as f64) <= threshold {
        return DataType::Select;
    }

    DataType::Text
}

pub fn is_required_header(header: &str) -> bool {
    let lower = header.to_lowercase();
    REQUIRED_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn infer_unit(header: &str) -> Option<String> {
    let lower = header.to_lowercase();
    if DIMENSION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(UNIT_MM.to_string())
    } else if PRICE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(UNIT_CURRENCY.to_string())
    } else {
        None
    }
}
