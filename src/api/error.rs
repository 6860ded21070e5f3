// ==========================================
// Catalog import - API error type
// ==========================================
// Responsibility: turn importer / repository errors into caller-facing
// errors with a stable code and an HTTP-style status
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== Request errors (400) =====
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("{message}")]
    UnreadableFile {
        message: String,
        attempts: Vec<String>,
    },

    // ===== Lookup errors (404) =====
    #[error("not found: {0}")]
    NotFound(String),

    // ===== Storage errors (409 / 500) =====
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    // ===== Generic (500) =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status of the error
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::UnsupportedFileType(_)
            | ApiError::UnreadableFile { .. } => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) | ApiError::Other(_) => 500,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            ApiError::UnreadableFile { .. } => "UNREADABLE_FILE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Read attempts listed for diagnosis (empty for other errors)
    pub fn attempts(&self) -> &[String] {
        match self {
            ApiError::UnreadableFile { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

// ==========================================
// From ImportError
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MissingFile | ImportError::MissingCategory => {
                ApiError::InvalidInput(err.to_string())
            }
            ImportError::InvalidMapping(_) => ApiError::InvalidInput(err.to_string()),
            ImportError::UnsupportedFormat(_) => ApiError::UnsupportedFileType(err.to_string()),
            ImportError::CategoryNotFound(_) => ApiError::NotFound(err.to_string()),
            ImportError::UnreadableFile { ref attempts } => ApiError::UnreadableFile {
                message: err.to_string(),
                attempts: attempts.clone(),
            },
            ImportError::EmptyFile => ApiError::UnreadableFile {
                message: err.to_string(),
                attempts: Vec::new(),
            },
            ImportError::Repository(e) => e.into(),
            ImportError::ConfigReadError { .. } | ImportError::InternalError(_) => {
                ApiError::InternalError(err.to_string())
            }
            ImportError::Other(e) => ApiError::Other(e),
        }
    }
}

// ==========================================
// From RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("unique constraint violated: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("foreign key violated: {}", msg))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::SerializationError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("database lock failed: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(e) => ApiError::Other(e),
        }
    }
}

/// Result alias
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_errors_map_to_request_statuses() {
        let cases: Vec<(ImportError, u16)> = vec![
            (ImportError::MissingFile, 400),
            (ImportError::UnsupportedFormat("image/png".into()), 400),
            (ImportError::InvalidMapping("eof".into()), 400),
            (ImportError::EmptyFile, 400),
            (ImportError::CategoryNotFound("c-9".into()), 404),
            (ImportError::InternalError("boom".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_unreadable_file_keeps_attempts() {
        let err = ApiError::from(ImportError::UnreadableFile {
            attempts: vec!["raw_cells [sheet 'A']: no text header".into()],
        });
        assert_eq!(err.code(), "UNREADABLE_FILE");
        assert_eq!(err.attempts().len(), 1);
    }

    #[test]
    fn test_repository_errors() {
        let not_found = ApiError::from(RepositoryError::NotFound {
            entity: "catalog_category".into(),
            id: "x".into(),
        });
        assert_eq!(not_found.status_code(), 404);

        let dup = ApiError::from(RepositoryError::UniqueConstraintViolation("sku".into()));
        assert_eq!(dup.status_code(), 409);
    }
}
