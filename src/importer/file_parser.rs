// ==========================================
// Catalog import - spreadsheet reader
// ==========================================
// Supports: workbook (.xlsx/.xls via calamine) / CSV (.csv)
// Read strategies form an ordered chain of plain functions; each
// returns Result<SpreadsheetTable, ParseFailure> and the first success wins
// ==========================================

use crate::domain::import::SpreadsheetTable;
use crate::domain::types::CellValue;
use crate::importer::error::{ImportError, ImporterResult, ParseFailure};
use crate::importer::importer_trait::SpreadsheetReader;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::{debug, warn};

/// Prefix of keys generated for blank header cells by the record strategy
pub const PLACEHOLDER_PREFIX: &str = "__EMPTY";

/// Delimiter candidates, in detection order
const CSV_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

pub type Grid = Vec<Vec<CellValue>>;

type SheetStrategy = fn(&[Vec<CellValue>]) -> Result<SpreadsheetTable, ParseFailure>;

/// Per-sheet strategies, tried in order on every sheet
const SHEET_STRATEGIES: [SheetStrategy; 2] = [raw_cells, coerced_blanks];

// ==========================================
// SourceFormat - parse strategy selection
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook,
}

impl SourceFormat {
    /// Pick the parser from the file name, then the declared MIME type
    ///
    /// The extension wins: some clients declare `application/vnd.ms-excel`
    /// for plain CSV files.
    pub fn detect(file_name: &str, mime: Option<&str>) -> Self {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".csv") {
            return SourceFormat::Csv;
        }
        if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            return SourceFormat::Workbook;
        }
        match mime.map(|m| m.trim().to_lowercase()) {
            Some(m) if m.starts_with("text/csv") => SourceFormat::Csv,
            _ => SourceFormat::Workbook,
        }
    }
}

// ==========================================
// CSV
// ==========================================

/// Decode CSV bytes: UTF-8 (BOM stripped), else Windows-1251
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            let (text, _, had_errors) = encoding_rs::WINDOWS_1251.decode(bytes);
            if had_errors {
                warn!("CSV is neither valid UTF-8 nor clean windows-1251, decoding lossily");
            }
            text.into_owned()
        }
    }
}

/// First candidate that splits the header line into several fields
///
/// The line is parsed with the candidate, so separators inside quoted
/// cells (`"Ширина, мм";Цена`) do not count.
fn detect_delimiter(first_line: &str) -> Option<u8> {
    CSV_DELIMITERS.iter().copied().find(|&delimiter| {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(first_line.as_bytes());
        matches!(reader.records().next(), Some(Ok(record)) if record.len() > 1)
    })
}

/// Trim a header cell and strip surrounding quote characters
pub fn clean_header_text(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Parse CSV bytes into a table; the first non-blank line is the header
pub fn read_csv(bytes: &[u8]) -> Result<SpreadsheetTable, ParseFailure> {
    let text = decode_text(bytes);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();

    let first = lines
        .first()
        .ok_or_else(|| ParseFailure::new("csv", "file contains no lines"))?;

    let grid: Grid = match detect_delimiter(first) {
        Some(delimiter) => {
            debug!(delimiter = %(delimiter as char).escape_default(), "CSV delimiter detected");
            let joined = lines.join("\n");
            let mut reader = ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .delimiter(delimiter)
                .from_reader(joined.as_bytes());

            let mut grid = Vec::with_capacity(lines.len());
            for record in reader.records() {
                let record = record?;
                grid.push(record.iter().map(CellValue::text).collect());
            }
            grid
        }
        // No delimiter: every line is a single column
        None => lines.iter().map(|l| vec![CellValue::text(*l)]).collect(),
    };

    let mut rows = grid.into_iter();
    let headers: Vec<CellValue> = rows
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|cell| match cell {
            CellValue::Text(s) => CellValue::Text(clean_header_text(&s)),
            other => other,
        })
        .collect();

    if !headers.iter().any(CellValue::is_text) {
        return Err(ParseFailure::new("csv", "header row is empty"));
    }

    Ok(SpreadsheetTable {
        headers,
        rows: rows.collect(),
        sheet_name: None,
        strategy: "csv".to_string(),
    })
}

// ==========================================
// Workbook
// ==========================================

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) | Data::DurationIso(_) => {
            CellValue::Text(data.to_string())
        }
    }
}

/// Open a workbook and load every sheet's used range
///
/// Sheets whose range cannot be read are reported in the returned failures
/// and skipped.
fn load_sheets(bytes: &[u8]) -> Result<(Vec<(String, Grid)>, Vec<ParseFailure>), ParseFailure> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let names = workbook.sheet_names();

    let mut sheets = Vec::with_capacity(names.len());
    let mut failures = Vec::new();
    for name in names {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let grid: Grid = range
                    .rows()
                    .map(|row| row.iter().map(cell_from_data).collect())
                    .collect();
                sheets.push((name, grid));
            }
            Err(e) => failures.push(ParseFailure::new("worksheet_range", e.to_string()).on_sheet(&name)),
        }
    }
    Ok((sheets, failures))
}

/// Strategy 1: first row of the used range is the header, cells kept as-is
pub fn raw_cells(grid: &[Vec<CellValue>]) -> Result<SpreadsheetTable, ParseFailure> {
    let first = grid
        .first()
        .ok_or_else(|| ParseFailure::new("raw_cells", "sheet is empty"))?;
    if !first.iter().any(CellValue::is_text) {
        return Err(ParseFailure::new("raw_cells", "first row has no text header"));
    }

    Ok(SpreadsheetTable {
        headers: first.clone(),
        rows: grid[1..].to_vec(),
        sheet_name: None,
        strategy: "raw_cells".to_string(),
    })
}

/// Strategy 2: skip leading rows without text, blanks coerced to ""
pub fn coerced_blanks(grid: &[Vec<CellValue>]) -> Result<SpreadsheetTable, ParseFailure> {
    let header_idx = grid
        .iter()
        .position(|row| row.iter().any(CellValue::is_text))
        .ok_or_else(|| ParseFailure::new("coerced_blanks", "no row with a text header"))?;

    let coerce = |row: &Vec<CellValue>| -> Vec<CellValue> {
        row.iter()
            .map(|c| match c {
                CellValue::Empty => CellValue::text(""),
                other => other.clone(),
            })
            .collect()
    };

    Ok(SpreadsheetTable {
        headers: coerce(&grid[header_idx]),
        rows: grid[header_idx + 1..].iter().map(coerce).collect(),
        sheet_name: None,
        strategy: "coerced_blanks".to_string(),
    })
}

/// Last resort: the first non-empty row of any sheet provides the keys
///
/// Any cell type is accepted as a key; blank cells receive generated
/// `__EMPTY`, `__EMPTY_1`, ... keys which the header sanitizer drops.
pub fn record_keys(sheets: &[(String, Grid)]) -> Result<SpreadsheetTable, ParseFailure> {
    for (name, grid) in sheets {
        let Some(idx) = grid.iter().position(|row| row.iter().any(|c| !c.is_blank())) else {
            continue;
        };

        let mut placeholders = 0usize;
        let headers = grid[idx]
            .iter()
            .map(|cell| match cell.as_text().filter(|s| !s.trim().is_empty()) {
                Some(s) => CellValue::Text(s),
                None => {
                    let key = if placeholders == 0 {
                        PLACEHOLDER_PREFIX.to_string()
                    } else {
                        format!("{}_{}", PLACEHOLDER_PREFIX, placeholders)
                    };
                    placeholders += 1;
                    CellValue::Text(key)
                }
            })
            .collect();

        return Ok(SpreadsheetTable {
            headers,
            rows: grid[idx + 1..].to_vec(),
            sheet_name: Some(name.clone()),
            strategy: "record_keys".to_string(),
        });
    }
    Err(ParseFailure::new("record_keys", "no sheet contains a non-empty row"))
}

/// Run the workbook chain: per-sheet strategies, then the record fallback
pub fn read_workbook(bytes: &[u8]) -> Result<SpreadsheetTable, Vec<ParseFailure>> {
    let (sheets, mut failures) = load_sheets(bytes).map_err(|f| vec![f])?;
    if sheets.is_empty() && failures.is_empty() {
        failures.push(ParseFailure::new("open_workbook", "workbook has no sheets"));
    }

    for (name, grid) in &sheets {
        for strategy in SHEET_STRATEGIES {
            match strategy(grid) {
                Ok(mut table) => {
                    table.sheet_name = Some(name.clone());
                    return Ok(table);
                }
                Err(failure) => failures.push(failure.on_sheet(name)),
            }
        }
    }

    match record_keys(&sheets) {
        Ok(table) => Ok(table),
        Err(failure) => {
            failures.push(failure);
            Err(failures)
        }
    }
}

// ==========================================
// UniversalSpreadsheetReader - format dispatch
// ==========================================
pub struct UniversalSpreadsheetReader;

impl SpreadsheetReader for UniversalSpreadsheetReader {
    fn read(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime: Option<&str>,
    ) -> ImporterResult<SpreadsheetTable> {
        let format = SourceFormat::detect(file_name, mime);
        let table = match format {
            SourceFormat::Csv => read_csv(bytes).map_err(|f| vec![f]),
            SourceFormat::Workbook => read_workbook(bytes),
        }
        .map_err(|failures| {
            warn!(file_name, attempts = failures.len(), "no read strategy produced a header row");
            ImportError::unreadable(&failures)
        })?;

        debug!(
            file_name,
            strategy = %table.strategy,
            sheet = ?table.sheet_name,
            rows = table.rows.len(),
            "spreadsheet read"
        );

        if table.rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }
        Ok(table)
    }
}
