// ==========================================
// Catalog import - repository layer
// ==========================================
// Responsibility: data access behind async traits, no business rules
// Constraint: every query is parameterized
// ==========================================

pub mod category_repo;
pub mod error;
pub mod import_history_repo;
pub mod product_repo;
pub mod template_repo;

pub use category_repo::{CategoryRepository, CategoryRepositoryImpl};
pub use error::{RepositoryError, RepositoryResult};
pub use import_history_repo::{
    ImportHistoryRepository, ImportHistoryRepositoryImpl, DEFAULT_HISTORY_LIMIT,
};
pub use product_repo::{ProductRepository, ProductRepositoryImpl};
pub use template_repo::{TemplateRepository, TemplateRepositoryImpl};
