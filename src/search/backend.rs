//! Search engine abstraction
//!
//! Components receive an `Arc<dyn SearchBackend>` at construction, so tests
//! can substitute an in-memory engine or a double.

use crate::search::document::IndexedProduct;
use crate::search::error::SearchResult;
use crate::search::facets::{FacetAggregations, FacetLimits};
use crate::search::query::CompiledQuery;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One round-trip to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Clauses, sort and page window; a `size` of 0 retrieves no documents
    pub query: CompiledQuery,

    /// Bucket caps for the facet aggregations
    pub facet_limits: FacetLimits,
}

impl SearchRequest {
    /// Aggregation-only request over the whole index
    pub fn universe(facet_limits: FacetLimits) -> Self {
        Self {
            query: CompiledQuery::match_all(),
            facet_limits,
        }
    }

    /// Filtered request returning a page of documents plus aggregations
    pub fn filtered(query: CompiledQuery, facet_limits: FacetLimits) -> Self {
        Self {
            query,
            facet_limits,
        }
    }

    pub fn wants_documents(&self) -> bool {
        self.query.size > 0
    }
}

/// What the engine answered for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResponse {
    /// Stored documents for the requested page
    pub hits: Vec<IndexedProduct>,

    /// Number of documents matching the query, independent of paging
    pub total: u64,

    /// Facet buckets scoped to the matching documents
    pub aggregations: FacetAggregations,
}

/// Outcome of a delete by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Search engine capability consumed by the service and the indexer
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short engine identifier used in logs and health output
    fn name(&self) -> &'static str;

    /// Execute one search request
    async fn execute(&self, request: &SearchRequest) -> SearchResult<RawSearchResponse>;

    /// Write a product, replacing any document with the same id
    async fn upsert(&self, product: &IndexedProduct) -> SearchResult<()>;

    /// Delete a product by id; a missing id is reported, not raised
    async fn delete(&self, id: &str) -> SearchResult<DeleteOutcome>;
}
