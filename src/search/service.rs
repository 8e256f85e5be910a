//! Faceted search over an injected engine

use crate::metrics::{SEARCH_QUERIES_TOTAL, SEARCH_QUERY_DURATION_SECONDS};
use crate::search::backend::{RawSearchResponse, SearchBackend, SearchRequest};
use crate::search::config::SearchConfig;
use crate::search::document::IndexedProduct;
use crate::search::error::SearchResult;
use crate::search::facets::{merge_facets, FacetAggregations, FacetCounts, FacetLimits};
use crate::search::query::{compile, CompiledQuery, SearchFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// One page of results with zero-filled facet counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Products on the requested page, as stored
    pub items: Vec<IndexedProduct>,

    /// Number of products matching the filter across all pages
    pub total: u64,

    pub page: usize,

    pub limit: usize,

    pub facets: FacetCounts,
}

/// Runs the universe and filtered passes and merges their facets
#[derive(Clone)]
pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
    limits: FacetLimits,
}

impl SearchService {
    pub fn new(backend: Arc<dyn SearchBackend>, config: &SearchConfig) -> Self {
        Self {
            backend,
            limits: FacetLimits::new(config.facet_bucket_limit, config.status_bucket_limit),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Every facet value present in the index, regardless of any filter
    pub async fn universe_pass(&self) -> SearchResult<FacetAggregations> {
        let response = self
            .backend
            .execute(&SearchRequest::universe(self.limits))
            .await?;
        Ok(response.aggregations)
    }

    /// The requested page plus facets scoped to the filtered result set
    pub async fn filtered_pass(&self, query: CompiledQuery) -> SearchResult<RawSearchResponse> {
        self.backend
            .execute(&SearchRequest::filtered(query, self.limits))
            .await
    }

    /// Search with facet counts reported for every known value, including
    /// values that match nothing under the current filter.
    pub async fn search(&self, filter: &SearchFilter) -> SearchResult<SearchResponse> {
        let started = Instant::now();
        let result = self.reconcile(filter).await;
        SEARCH_QUERY_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(response) => {
                SEARCH_QUERIES_TOTAL.with_label_values(&["success"]).inc();
                tracing::debug!(
                    engine = self.backend.name(),
                    total = response.total,
                    page = response.page,
                    "Search completed"
                );
            }
            Err(e) => {
                SEARCH_QUERIES_TOTAL.with_label_values(&["error"]).inc();
                tracing::error!(engine = self.backend.name(), error = %e, "Search failed");
            }
        }

        result
    }

    /// Universe pass, filtered pass, then merge. [`SearchService::search`]
    /// adds logging and metrics around this.
    pub async fn reconcile(&self, filter: &SearchFilter) -> SearchResult<SearchResponse> {
        let query = compile(filter);
        let page = query.page;
        let limit = query.size;

        let universe = self.universe_pass().await?;
        let filtered = self.filtered_pass(query).await?;

        Ok(SearchResponse {
            items: filtered.hits,
            total: filtered.total,
            page,
            limit,
            facets: merge_facets(&universe, &filtered.aggregations),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::backend::DeleteOutcome;
    use crate::search::error::SearchError;
    use crate::search::facets::FacetBucket;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Engine double answering universe and filtered passes from fixtures
    struct ScriptedBackend {
        universe: FacetAggregations,
        filtered: RawSearchResponse,
        requests: Mutex<Vec<SearchRequest>>,
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn execute(&self, request: &SearchRequest) -> SearchResult<RawSearchResponse> {
            self.requests.lock().push(request.clone());
            if request.wants_documents() {
                Ok(self.filtered.clone())
            } else {
                Ok(RawSearchResponse {
                    aggregations: self.universe.clone(),
                    ..Default::default()
                })
            }
        }

        async fn upsert(&self, _product: &IndexedProduct) -> SearchResult<()> {
            Ok(())
        }

        async fn delete(&self, _id: &str) -> SearchResult<DeleteOutcome> {
            Ok(DeleteOutcome::NotFound)
        }
    }

    struct UnreachableBackend;

    #[async_trait]
    impl SearchBackend for UnreachableBackend {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        async fn execute(&self, _request: &SearchRequest) -> SearchResult<RawSearchResponse> {
            Err(SearchError::Transport("connection refused".to_string()))
        }

        async fn upsert(&self, _product: &IndexedProduct) -> SearchResult<()> {
            Err(SearchError::Transport("connection refused".to_string()))
        }

        async fn delete(&self, _id: &str) -> SearchResult<DeleteOutcome> {
            Err(SearchError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_two_passes_in_order() {
        let backend = Arc::new(ScriptedBackend {
            universe: FacetAggregations {
                statuses: vec![FacetBucket::new("active", 3), FacetBucket::new("draft", 1)],
                ..Default::default()
            },
            filtered: RawSearchResponse {
                total: 1,
                aggregations: FacetAggregations {
                    statuses: vec![FacetBucket::new("draft", 1), FacetBucket::new("stale", 9)],
                    ..Default::default()
                },
                ..Default::default()
            },
            requests: Mutex::new(Vec::new()),
        });
        let service = SearchService::new(backend.clone(), &SearchConfig::default());

        let filter = SearchFilter::new().with_status("draft").with_page(2, 5);
        let response = service.search(&filter).await.unwrap();

        assert_eq!(response.total, 1);
        assert_eq!(response.page, 2);
        assert_eq!(response.limit, 5);
        assert_eq!(
            response.facets.statuses,
            vec![FacetBucket::new("active", 0), FacetBucket::new("draft", 1)]
        );

        let requests = backend.requests.lock();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].query.is_match_all());
        assert_eq!(requests[0].query.size, 0);
        assert_eq!(requests[1].query.offset, 5);
        assert_eq!(requests[1].facet_limits, requests[0].facet_limits);
    }

    #[tokio::test]
    async fn test_engine_failure_yields_no_partial_result() {
        let service = SearchService::new(Arc::new(UnreachableBackend), &SearchConfig::default());

        let err = service.search(&SearchFilter::default()).await.unwrap_err();
        assert!(matches!(err, SearchError::Transport(_)));
        assert_eq!(service.backend_name(), "unreachable");
    }
}
