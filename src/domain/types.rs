// ==========================================
// Catalog import - domain value types
// ==========================================
// Responsibility: cell values, property-bag values and the small
// enums shared by every pipeline stage
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// CellValue - one spreadsheet cell
// ==========================================
// `Empty` is the absent-cell sentinel. It is never equal to `Text("")`
// nor to `Number(0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Absent, or text that is empty after trimming
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, CellValue::Text(s) if !s.trim().is_empty())
    }

    /// String form of the cell; `None` for the absent sentinel
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    pub fn to_property_value(&self) -> PropertyValue {
        match self {
            CellValue::Empty => PropertyValue::Null,
            CellValue::Text(s) => PropertyValue::String(s.clone()),
            CellValue::Number(n) => PropertyValue::Number(*n),
            CellValue::Bool(b) => PropertyValue::Boolean(*b),
        }
    }
}

/// Integral floats print without a fractional part ("1500" not "1500.0")
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ==========================================
// PropertyValue - closed variant stored in a product property bag
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Null,
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<String> {
        match self {
            PropertyValue::String(s) => Some(s.clone()),
            PropertyValue::Number(n) => Some(format_number(*n)),
            PropertyValue::Boolean(b) => Some(b.to_string()),
            PropertyValue::Null => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Null => true,
            PropertyValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

// ==========================================
// DataType - semantic column type
// ==========================================
// Deserialization is lenient: stored descriptors written by other tools
// use names such as "string", "enum" or "image"; unknown names read as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DataType {
    #[default]
    Text,
    Number,
    Boolean,
    Url,
    Select,
}

impl From<String> for DataType {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "number" | "numeric" | "integer" | "int" | "float" | "decimal" => DataType::Number,
            "boolean" | "bool" | "checkbox" => DataType::Boolean,
            "url" | "image" | "image_url" => DataType::Url,
            "select" | "enum" | "list" => DataType::Select,
            _ => DataType::Text,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Url => "url",
            DataType::Select => "select",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// MappingKind - which source produced the resolved mapping
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Explicit,
    Category,
    Template,
    Fallback,
}

// ==========================================
// ImportMode - headers probe or full run
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    Headers,
    Full,
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "headers" => Ok(ImportMode::Headers),
            "full" | "" => Ok(ImportMode::Full),
            other => Err(format!("unknown import mode: {}", other)),
        }
    }
}

// ==========================================
// ProcessingStatus - outcome of a full run
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Success,
    Partial,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStatus::Success => write!(f, "success"),
            ProcessingStatus::Partial => write!(f, "partial"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_distinct_from_zero_and_empty_text() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::text("  ").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert_ne!(CellValue::Empty, CellValue::text(""));
        assert_eq!(CellValue::Empty.as_text(), None);
        assert_eq!(CellValue::text("").as_text(), Some(String::new()));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(CellValue::Number(1500.0).as_text().unwrap(), "1500");
        assert_eq!(CellValue::Number(99.5).as_text().unwrap(), "99.5");
    }

    #[test]
    fn test_data_type_lenient_decoding() {
        let t: DataType = serde_json::from_str("\"string\"").unwrap();
        assert_eq!(t, DataType::Text);
        let t: DataType = serde_json::from_str("\"NUMBER\"").unwrap();
        assert_eq!(t, DataType::Number);
        let t: DataType = serde_json::from_str("\"enum\"").unwrap();
        assert_eq!(t, DataType::Select);
        assert_eq!(serde_json::to_string(&DataType::Url).unwrap(), "\"url\"");
    }

    #[test]
    fn test_property_value_json_shape() {
        let v = serde_json::to_value(PropertyValue::String("A-1".into())).unwrap();
        assert_eq!(v, serde_json::json!("A-1"));
        let v: PropertyValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, PropertyValue::Null);
        let v: PropertyValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, PropertyValue::Boolean(true));
    }

    #[test]
    fn test_import_mode_parse() {
        assert_eq!("headers".parse::<ImportMode>().unwrap(), ImportMode::Headers);
        assert_eq!("FULL".parse::<ImportMode>().unwrap(), ImportMode::Full);
        assert!("preview".parse::<ImportMode>().is_err());
    }
}
