// ==========================================
// Catalog import - row processor
// ==========================================
// Responsibility: build a property bag per data row, extract identity
// and price fields, apply soft validation
// Policy: missing required fields and type mismatches are warnings;
// the only rejection is a row with no data at all
// ==========================================

use crate::domain::catalog::FieldDescriptor;
use crate::domain::import::{
    InferredSchema, ProcessingOutcome, ResolvedMapping, RowRejection, SanitizedHeaders,
    SpreadsheetTable,
};
use crate::domain::product::{ProductDraft, PropertyBag};
use crate::domain::types::{CellValue, DataType, MappingKind};
use crate::i18n::t_with_args;
use crate::importer::importer_trait::RowProcessor as RowProcessorTrait;
use crate::importer::schema_inferencer::{is_boolean_token, parses_as_number};
use std::collections::HashSet;
use tracing::debug;

/// Rejection reason of a row whose property bag stays empty
pub const REASON_NO_DATA: &str = "row has no data";

/// Header row occupies line 1; data row `i` (0-based) is line `i + 2`
pub const ROW_NUMBER_OFFSET: usize = 2;

// ===== Header candidates (ordered) =====
pub const PRICE_CANDIDATES: [&str; 5] = ["Цена", "Стоимость", "РРЦ", "Price", "Cost"];
const NAME_CANDIDATES: [&str; 4] = ["Название", "Наименование", "Name", "Товар"];
const SKU_CANDIDATES: [&str; 4] = ["Артикул", "SKU", "Article", "Код"];
const BRAND_CANDIDATES: [&str; 3] = ["Бренд", "Производитель", "Brand"];
const MODEL_CANDIDATES: [&str; 2] = ["Модель", "Model"];
const DESCRIPTION_CANDIDATES: [&str; 2] = ["Описание", "Description"];
const STOCK_CANDIDATES: [&str; 4] = ["Остаток", "Количество", "Stock", "Qty"];

const CURRENCY_MARKERS: [&str; 4] = ["₽", "руб.", "руб", "р."];

// ==========================================
// RowContext - per-run inputs of the processor
// ==========================================
pub struct RowContext<'a> {
    pub headers: &'a SanitizedHeaders,
    pub mapping: &'a ResolvedMapping,
    /// Fields whose absence produces a warning
    pub required_fields: &'a [FieldDescriptor],
    pub schema: Option<&'a InferredSchema>,
    /// Key the bag by the resolved target field instead of the header text
    pub rename_to_target_field: bool,
}

impl RowContext<'_> {
    fn target_for(&self, header: &str) -> Option<&str> {
        if self.mapping.kind == MappingKind::Fallback {
            return None;
        }
        self.mapping.target_for(header)
    }

    fn bag_key(&self, header: &str) -> String {
        match self.target_for(header) {
            Some(target) if self.rename_to_target_field && !target.is_empty() => target.to_string(),
            _ => header.to_string(),
        }
    }
}

pub struct RowProcessor;

impl RowProcessorTrait for RowProcessor {
    fn process(&self, table: &SpreadsheetTable, ctx: &RowContext<'_>) -> ProcessingOutcome {
        let mut outcome = ProcessingOutcome::default();

        for (idx, row) in table.rows.iter().enumerate() {
            let row_number = idx + ROW_NUMBER_OFFSET;

            // Build
            let cells: Vec<(&str, &CellValue)> = ctx
                .headers
                .zip_row(row)
                .filter_map(|(h, c)| c.filter(|c| !c.is_blank()).map(|c| (h, c)))
                .collect();

            let mut bag = PropertyBag::new();
            for (header, cell) in &cells {
                bag.insert(ctx.bag_key(header), cell.to_property_value());
            }

            if bag.is_empty() {
                outcome.rejected.push(RowRejection {
                    row_number,
                    reasons: vec![REASON_NO_DATA.to_string()],
                });
                continue;
            }

            // Labels visible for this row: header text plus mapped targets
            let labelled: Vec<(Vec<&str>, &CellValue)> = cells
                .iter()
                .map(|(h, c)| {
                    let mut labels = vec![*h];
                    if let Some(target) = ctx.target_for(h) {
                        labels.push(target);
                    }
                    (labels, *c)
                })
                .collect();

            let mut draft = ProductDraft {
                row_number,
                name: find_candidate(&labelled, &NAME_CANDIDATES, text_value),
                sku: find_candidate(&labelled, &SKU_CANDIDATES, text_value),
                brand: find_candidate(&labelled, &BRAND_CANDIDATES, text_value),
                model: find_candidate(&labelled, &MODEL_CANDIDATES, text_value),
                description: find_candidate(&labelled, &DESCRIPTION_CANDIDATES, text_value),
                price: find_candidate(&labelled, &PRICE_CANDIDATES, decimal_value),
                stock: find_candidate(&labelled, &STOCK_CANDIDATES, stock_value),
                properties: bag,
                warnings: Vec::new(),
            };

            // Validate (soft)
            draft.warnings.extend(missing_required(&labelled, ctx.required_fields, row_number));
            if let Some(schema) = ctx.schema {
                draft.warnings.extend(type_mismatches(&cells, schema, row_number));
            }

            outcome.accepted.push(draft);
        }

        debug!(
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "rows processed"
        );
        outcome
    }
}

/// First value found under an ordered list of header candidates
///
/// Substring match, case-sensitive pass first, then case-insensitive.
fn find_candidate<T>(
    labelled: &[(Vec<&str>, &CellValue)],
    candidates: &[&str],
    parse: fn(&CellValue) -> Option<T>,
) -> Option<T> {
    for candidate in candidates {
        for (labels, cell) in labelled {
            if labels.iter().any(|l| l.contains(candidate)) {
                if let Some(v) = parse(*cell) {
                    return Some(v);
                }
            }
        }
    }

    for candidate in candidates {
        let candidate = candidate.to_lowercase();
        for (labels, cell) in labelled {
            if labels.iter().any(|l| l.to_lowercase().contains(&candidate)) {
                if let Some(v) = parse(*cell) {
                    return Some(v);
                }
            }
        }
    }
    None
}

fn text_value(cell: &CellValue) -> Option<String> {
    cell.as_text()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a price-like cell: spaces and currency markers removed,
/// a lone decimal comma accepted
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let mut s: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    for marker in CURRENCY_MARKERS {
        s = s.replace(marker, "");
    }

    if s.contains(',') {
        if s.contains('.') {
            // "1,234.50": comma as thousands separator
            s = s.replace(',', "");
        } else if s.matches(',').count() == 1 {
            s = s.replace(',', ".");
        }
    }

    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn decimal_value(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_decimal(s),
        _ => None,
    }
}

fn stock_value(cell: &CellValue) -> Option<i64> {
    decimal_value(cell)
        .filter(|n| *n >= 0.0)
        .map(|n| n.trunc() as i64)
}

fn missing_required(
    labelled: &[(Vec<&str>, &CellValue)],
    required: &[FieldDescriptor],
    row_number: usize,
) -> Vec<String> {
    if required.is_empty() {
        return Vec::new();
    }

    let present: HashSet<String> = labelled
        .iter()
        .flat_map(|(labels, _)| labels.iter().map(|l| l.trim().to_lowercase()))
        .collect();

    required
        .iter()
        .filter(|field| {
            let by_name = present.contains(&field.field_name.trim().to_lowercase());
            let by_display = field
                .display_name
                .as_deref()
                .map(|d| present.contains(&d.trim().to_lowercase()))
                .unwrap_or(false);
            !by_name && !by_display
        })
        .map(|field| {
            let label = field.display_name.as_deref().unwrap_or(&field.field_name);
            let row = row_number.to_string();
            t_with_args("row.missing_required", &[("row", row.as_str()), ("field", label)])
        })
        .collect()
}

fn type_mismatches(
    cells: &[(&str, &CellValue)],
    schema: &InferredSchema,
    row_number: usize,
) -> Vec<String> {
    let mut warnings = Vec::new();
    for (header, cell) in cells {
        let Some(column) = schema.column_for(header) else {
            continue;
        };
        let key = match column.data_type {
            DataType::Number if !parses_as_number(cell) => "row.not_a_number",
            DataType::Boolean if !is_boolean_token(cell) => "row.not_a_boolean",
            _ => continue,
        };
        let value = cell.as_text().unwrap_or_default();
        let row = row_number.to_string();
        warnings.push(t_with_args(
            key,
            &[("row", row.as_str()), ("column", *header), ("value", value.as_str())],
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::MappingEntry;
    use crate::domain::types::PropertyValue;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn headers(names: &[&str]) -> SanitizedHeaders {
        SanitizedHeaders {
            names: names.iter().map(|s| s.to_string()).collect(),
            source_indices: (0..names.len()).collect(),
        }
    }

    fn fallback(names: &[&str]) -> ResolvedMapping {
        ResolvedMapping {
            kind: MappingKind::Fallback,
            entries: names
                .iter()
                .map(|n| MappingEntry {
                    source_header: n.to_string(),
                    target_field: n.to_string(),
                })
                .collect(),
            property_override: None,
        }
    }

    fn table(rows: Vec<Vec<CellValue>>) -> SpreadsheetTable {
        SpreadsheetTable {
            rows,
            ..Default::default()
        }
    }

    #[test]
    fn test_bag_keyed_by_original_header() {
        let names = ["Название", "Цена", "Артикул"];
        let (h, m) = (headers(&names), fallback(&names));
        let ctx = RowContext {
            headers: &h,
            mapping: &m,
            required_fields: &[],
            schema: None,
            rename_to_target_field: false,
        };
        let out = RowProcessor.process(&table(vec![vec![t("Дверь А"), t("1500"), t("A-1")]]), &ctx);

        let draft = &out.accepted[0];
        assert_eq!(draft.row_number, 2);
        assert_eq!(draft.properties["Название"], PropertyValue::String("Дверь А".into()));
        assert_eq!(draft.properties["Цена"], PropertyValue::String("1500".into()));
        assert_eq!(draft.price, Some(1500.0));
        assert_eq!(draft.name.as_deref(), Some("Дверь А"));
        assert_eq!(draft.sku.as_deref(), Some("A-1"));
    }

    #[test]
    fn test_empty_row_is_the_only_rejection() {
        let names = ["Название", "Цена"];
        let (h, m) = (headers(&names), fallback(&names));
        let ctx = RowContext {
            headers: &h,
            mapping: &m,
            required_fields: &[],
            schema: None,
            rename_to_target_field: false,
        };
        let rows = vec![
            vec![t(""), t("  ")],
            vec![CellValue::Empty],
            vec![],
            vec![CellValue::Number(0.0)],
        ];
        let out = RowProcessor.process(&table(rows), &ctx);

        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.accepted[0].row_number, 5);
        assert_eq!(out.rejected.len(), 3);
        assert_eq!(out.rejected[0].row_number, 2);
        assert_eq!(out.rejected[0].reasons, vec![REASON_NO_DATA.to_string()]);
    }

    #[test]
    fn test_missing_required_field_is_only_a_warning() {
        let names = ["Название", "Цвет"];
        let (h, m) = (headers(&names), fallback(&names));
        let mut required = FieldDescriptor::new("sku").required();
        required.display_name = Some("Артикул".into());
        let required = vec![required, FieldDescriptor::new("название").required()];
        let ctx = RowContext {
            headers: &h,
            mapping: &m,
            required_fields: &required,
            schema: None,
            rename_to_target_field: false,
        };
        let out = RowProcessor.process(&table(vec![vec![t("Дверь"), t("Белый")]]), &ctx);

        assert!(out.rejected.is_empty());
        let warnings = &out.accepted[0].warnings;
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Артикул"));
    }

    #[test]
    fn test_rename_to_target_field_uses_resolved_names() {
        let h = headers(&["Наим.", "Стоимость, руб"]);
        let m = ResolvedMapping {
            kind: MappingKind::Explicit,
            entries: vec![
                MappingEntry {
                    source_header: "Наим.".into(),
                    target_field: "name".into(),
                },
                MappingEntry {
                    source_header: "Стоимость, руб".into(),
                    target_field: "price".into(),
                },
            ],
            property_override: None,
        };
        let ctx = RowContext {
            headers: &h,
            mapping: &m,
            required_fields: &[],
            schema: None,
            rename_to_target_field: true,
        };
        let out = RowProcessor.process(&table(vec![vec![t("Окно"), t("12 500,50 ₽")]]), &ctx);

        let draft = &out.accepted[0];
        assert!(draft.properties.contains_key("name"));
        assert!(draft.properties.contains_key("price"));
        assert_eq!(draft.name.as_deref(), Some("Окно"));
        assert_eq!(draft.price, Some(12500.5));
    }

    #[test]
    fn test_price_case_sensitive_pass_precedes_case_insensitive() {
        let names = ["цена опт", "Цена"];
        let (h, m) = (headers(&names), fallback(&names));
        let ctx = RowContext {
            headers: &h,
            mapping: &m,
            required_fields: &[],
            schema: None,
            rename_to_target_field: false,
        };
        let out = RowProcessor.process(&table(vec![vec![t("100"), t("200")]]), &ctx);
        assert_eq!(out.accepted[0].price, Some(200.0));

        // non-numeric exact match falls through to the next candidate
        let names = ["Цена", "price"];
        let (h, m) = (headers(&names), fallback(&names));
        let ctx = RowContext {
            headers: &h,
            mapping: &m,
            required_fields: &[],
            schema: None,
            rename_to_target_field: false,
        };
        let out = RowProcessor.process(&table(vec![vec![t("договорная"), t("300")]]), &ctx);
        assert_eq!(out.accepted[0].price, Some(300.0));
    }

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(parse_decimal("1500"), Some(1500.0));
        assert_eq!(parse_decimal("1 500,5"), Some(1500.5));
        assert_eq!(parse_decimal("1\u{a0}200 руб."), Some(1200.0));
        assert_eq!(parse_decimal("1,234.50"), Some(1234.5));
        assert_eq!(parse_decimal("по запросу"), None);
        assert_eq!(parse_decimal(""), None);
    }
}
