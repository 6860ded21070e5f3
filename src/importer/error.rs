// ==========================================
// Catalog import - importer error types
// ==========================================
// Tool: thiserror derive
// ==========================================

use crate::repository::error::RepositoryError;
use std::fmt;
use thiserror::Error;

/// Importer error type
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== Input errors (fatal, nothing written) =====
    #[error("file is missing from the request")]
    MissingFile,

    #[error("category identifier is missing from the request")]
    MissingCategory,

    #[error("unsupported file type: {0} (allowed: .xlsx, .xls, .csv)")]
    UnsupportedFormat(String),

    #[error("invalid mapping JSON: {0}")]
    InvalidMapping(String),

    #[error("category not found: {0}")]
    CategoryNotFound(String),

    // ===== Parse errors (fatal for the request) =====
    #[error("file could not be read by any strategy: {}", .attempts.join("; "))]
    UnreadableFile { attempts: Vec<String> },

    #[error("file has headers but no data rows")]
    EmptyFile,

    // ===== Storage =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("configuration read failed (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== Generic =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::InvalidMapping(err.to_string())
    }
}

/// Result alias (the `ImportResult` name belongs to the run summary DTO)
pub type ImporterResult<T> = Result<T, ImportError>;

// ==========================================
// ParseFailure - one failed read strategy
// ==========================================
// Threaded through the reader's fallback chain as a plain value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub strategy: &'static str,
    pub sheet: Option<String>,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(strategy: &'static str, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            sheet: None,
            reason: reason.into(),
        }
    }

    pub fn on_sheet(mut self, sheet: &str) -> Self {
        self.sheet = Some(sheet.to_string());
        self
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{} [sheet '{}']: {}", self.strategy, sheet, self.reason),
            None => write!(f, "{}: {}", self.strategy, self.reason),
        }
    }
}

impl From<csv::Error> for ParseFailure {
    fn from(err: csv::Error) -> Self {
        ParseFailure::new("csv", err.to_string())
    }
}

impl From<calamine::Error> for ParseFailure {
    fn from(err: calamine::Error) -> Self {
        ParseFailure::new("open_workbook", err.to_string())
    }
}

impl ImportError {
    pub fn unreadable(failures: &[ParseFailure]) -> Self {
        ImportError::UnreadableFile {
            attempts: failures.iter().map(|f| f.to_string()).collect(),
        }
    }
}
