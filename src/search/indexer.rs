//! Index upsert and delete adapter

use crate::metrics::INDEX_OPERATIONS_TOTAL;
use crate::search::backend::{DeleteOutcome, SearchBackend};
use crate::search::document::{IndexedProduct, ProductPayload};
use crate::search::error::{SearchError, SearchResult};
use std::sync::Arc;

/// Applies catalog changes to the search index
#[derive(Clone)]
pub struct ProductIndexer {
    backend: Arc<dyn SearchBackend>,
}

impl ProductIndexer {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Normalize an inbound payload and write it, replacing any document
    /// with the same id.
    pub async fn upsert(&self, payload: ProductPayload) -> SearchResult<IndexedProduct> {
        let product = payload.normalize()?;
        self.upsert_product(&product).await?;
        Ok(product)
    }

    /// Write an already-normalized product
    pub async fn upsert_product(&self, product: &IndexedProduct) -> SearchResult<()> {
        let result = self.backend.upsert(product).await;
        record("upsert", result.is_ok());
        result
    }

    /// Delete by id. A missing document counts as success.
    pub async fn remove(&self, id: &str) -> SearchResult<DeleteOutcome> {
        let id = id.trim();
        if id.is_empty() {
            return Err(SearchError::InvalidDocument("missing field `id`".to_string()));
        }

        let result = self.backend.delete(id).await;
        record("delete", result.is_ok());

        if let Ok(DeleteOutcome::NotFound) = result {
            tracing::info!(product_id = %id, "Document not found, skipping delete");
        }
        result
    }
}

fn record(operation: &str, ok: bool) {
    let outcome = if ok { "success" } else { "error" };
    INDEX_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}
