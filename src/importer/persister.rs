// ==========================================
// Catalog import - product persister
// ==========================================
// Responsibility: write accepted drafts one by one
// Isolation: each draft is its own insert; a failure is recorded and
// the loop moves on
// ==========================================

use crate::domain::import::{PersistFailure, PersistOutcome};
use crate::domain::product::{NewProduct, ProductDraft};
use crate::importer::importer_trait::ImportPersister as ImportPersisterTrait;
use crate::repository::ProductRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name given to drafts without a recognizable name column
pub const UNNAMED_PRODUCT: &str = "unnamed";

/// Generated SKU: `SKU_<unix millis>_<9 random characters>`
pub fn generate_sku() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("SKU_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Fill the defaults a stored product needs
pub fn to_new_product(category_id: &str, draft: &ProductDraft) -> NewProduct {
    NewProduct {
        sku: draft
            .sku
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(generate_sku),
        name: draft
            .name
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_PRODUCT.to_string()),
        catalog_category_id: category_id.to_string(),
        base_price: draft.price.unwrap_or(0.0),
        stock_quantity: draft.stock.unwrap_or(0),
        brand: draft.brand.clone(),
        model: draft.model.clone(),
        description: draft.description.clone(),
        properties: draft.properties.clone(),
    }
}

pub struct ImportPersister {
    product_repo: Arc<dyn ProductRepository>,
}

impl ImportPersister {
    pub fn new(product_repo: Arc<dyn ProductRepository>) -> Self {
        Self { product_repo }
    }
}

#[async_trait]
impl ImportPersisterTrait for ImportPersister {
    async fn persist(&self, category_id: &str, accepted: &[ProductDraft]) -> PersistOutcome {
        let mut outcome = PersistOutcome {
            attempted: accepted.len(),
            ..Default::default()
        };

        for draft in accepted {
            let product = to_new_product(category_id, draft);
            match self.product_repo.create(&product).await {
                Ok(saved) => {
                    debug!(row_number = draft.row_number, sku = %saved.sku, "product saved");
                    outcome.saved.push(saved);
                }
                Err(e) => {
                    warn!(row_number = draft.row_number, sku = %product.sku, error = %e, "product save failed");
                    outcome.failures.push(PersistFailure {
                        row_number: draft.row_number,
                        sku: product.sku,
                        name: product.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            attempted = outcome.attempted,
            saved = outcome.saved.len(),
            failed = outcome.failures.len(),
            "persistence finished"
        );
        outcome
    }
}
