//! Faceted product search
//!
//! Filters compile into engine-neutral clauses. An injected engine executes
//! them, and the service merges facet counts from two passes:
//!
//! - **Universe pass**: aggregations over the whole index. This is the full
//!   vocabulary of categories, characters and statuses.
//! - **Filtered pass**: the requested page, the total, and aggregations
//!   scoped to the matching documents.
//!
//! Every value from the universe pass is reported. Values the filter
//! excludes are reported with a count of 0.
//!
//! ```text
//! SearchFilter ──compile──▶ CompiledQuery
//!                               │
//!          ┌────────────────────┴───────────────────┐
//!          ▼                                        ▼
//!   universe pass (match_all, size 0)      filtered pass (page + aggs)
//!          │                                        │
//!          └──────────────▶ merge_facets ◀──────────┘
//!                               │
//!                               ▼
//!                        SearchResponse
//! ```
//!
//! Two engines implement [`SearchBackend`]: the embedded Tantivy
//! [`IndexManager`] and the remote [`ElasticsearchBackend`].
//!
//! # Example
//!
//! ```no_run
//! use catalog_search::search::{IndexManager, SearchConfig, SearchFilter, SearchService, SortOrder};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SearchConfig::default();
//!     let engine = Arc::new(IndexManager::new(&config).await?);
//!     let search = SearchService::new(engine, &config);
//!
//!     let filter = SearchFilter::new()
//!         .with_categories(vec!["plush"])
//!         .with_price_range(Some(1000), Some(5000))
//!         .with_sort("price", SortOrder::Asc);
//!
//!     let page = search.search(&filter).await?;
//!     println!("Showing {} of {}", page.items.len(), page.total);
//!
//!     Ok(())
//! }
//! ```

mod backend;
mod config;
mod document;
mod elasticsearch;
mod error;
mod facets;
mod index;
mod indexer;
mod query;
mod schema;
mod service;

pub use backend::{DeleteOutcome, RawSearchResponse, SearchBackend, SearchRequest};
pub use config::{ElasticsearchConfig, EngineKind, SearchConfig, SearchConfigBuilder};
pub use document::{Identifier, IndexedProduct, ProductPayload, ScalarOrList, Tag};
pub use elasticsearch::{index_definition, render_request, ElasticsearchBackend};
pub use error::{SearchError, SearchResult};
pub use facets::{
    merge_dimension, merge_facets, FacetAggregations, FacetBucket, FacetCounts, FacetDimension,
    FacetLimits,
};
pub use index::{IndexManager, IndexStats};
pub use indexer::ProductIndexer;
pub use query::{
    compile, Clause, CompiledQuery, SearchFilter, SortField, SortOrder, SortSpec, TagDimension,
    DEFAULT_PAGE_SIZE,
};
pub use schema::ProductSchema;
pub use service::{SearchResponse, SearchService};

use std::sync::Arc;

/// Build the engine selected by configuration
pub async fn connect_engine(
    search: &SearchConfig,
    elasticsearch: &ElasticsearchConfig,
) -> SearchResult<Arc<dyn SearchBackend>> {
    let engine: Arc<dyn SearchBackend> = match search.engine {
        EngineKind::Tantivy => Arc::new(IndexManager::new(search).await?),
        EngineKind::Elasticsearch => Arc::new(ElasticsearchBackend::new(elasticsearch)?),
    };

    tracing::info!(engine = engine.name(), "Search engine initialized");
    Ok(engine)
}
