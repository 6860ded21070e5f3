// ==========================================
// Catalog import - application layer
// ==========================================
// Responsibility: process-wide state and the HTTP surface
// ==========================================

pub mod http;
pub mod state;

pub use http::{router, BODY_LIMIT_BYTES};
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
