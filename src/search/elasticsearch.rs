//! Elasticsearch engine over the REST API

use crate::search::backend::{DeleteOutcome, RawSearchResponse, SearchBackend, SearchRequest};
use crate::search::config::ElasticsearchConfig;
use crate::search::document::IndexedProduct;
use crate::search::error::{SearchError, SearchResult};
use crate::search::facets::{FacetAggregations, FacetBucket, FacetDimension, FacetLimits};
use crate::search::query::{Clause, CompiledQuery, SortField, SortSpec, TagDimension};
use crate::search::schema::{MAX_GRAM, MIN_GRAM};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Elasticsearch-backed product index
pub struct ElasticsearchBackend {
    client: Client,
    base_url: Url,
    index_name: String,
}

impl ElasticsearchBackend {
    pub fn new(config: &ElasticsearchConfig) -> SearchResult<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            SearchError::InvalidConfiguration(format!("Invalid Elasticsearch URL {}: {}", config.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SearchError::InvalidConfiguration(format!(
                "Elasticsearch URL {} cannot be used as a base",
                config.url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SearchError::InvalidConfiguration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            index_name: config.index_name.clone(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.index_name).extend(segments);
        }
        url
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> SearchResult<(StatusCode, Value)> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok((status, value))
    }

    /// Create the product index with its analyzers and mappings.
    ///
    /// Returns `false` when the index already exists.
    pub async fn provision(&self) -> SearchResult<bool> {
        let (status, body) = self
            .send(Method::PUT, self.url(&[]), Some(&index_definition()))
            .await?;

        if status.is_success() {
            tracing::info!(index = %self.index_name, "Created Elasticsearch index");
            return Ok(true);
        }

        if status == StatusCode::BAD_REQUEST && error_type(&body) == Some("resource_already_exists_exception") {
            tracing::info!(index = %self.index_name, "Elasticsearch index already exists");
            return Ok(false);
        }

        Err(engine_error(status, &body))
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn execute(&self, request: &SearchRequest) -> SearchResult<RawSearchResponse> {
        let body = render_request(request);
        let (status, response) = self
            .send(Method::POST, self.url(&["_search"]), Some(&body))
            .await?;

        if !status.is_success() {
            return Err(engine_error(status, &response));
        }

        parse_search_response(response)
    }

    async fn upsert(&self, product: &IndexedProduct) -> SearchResult<()> {
        let mut url = self.url(&["_doc", &product.id]);
        url.query_pairs_mut().append_pair("refresh", "wait_for");

        let body = serde_json::to_value(product)?;
        let (status, response) = self.send(Method::PUT, url, Some(&body)).await?;

        if !status.is_success() {
            return Err(SearchError::IndexingFailed(engine_error(status, &response).to_string()));
        }

        tracing::debug!(product_id = %product.id, "Product indexed");
        Ok(())
    }

    async fn delete(&self, id: &str) -> SearchResult<DeleteOutcome> {
        let mut url = self.url(&["_doc", id]);
        url.query_pairs_mut().append_pair("refresh", "wait_for");

        let (status, response) = self.send(Method::DELETE, url, None).await?;

        match status {
            s if s.is_success() => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            s => Err(SearchError::DeletionFailed(engine_error(s, &response).to_string())),
        }
    }
}

/// Render a compiled query as an Elasticsearch bool query
pub fn render_query(compiled: &CompiledQuery) -> Value {
    if compiled.is_match_all() {
        return json!({ "match_all": {} });
    }

    let must: Vec<Value> = compiled.clauses.iter().map(render_clause).collect();
    json!({ "bool": { "must": must } })
}

fn render_clause(clause: &Clause) -> Value {
    match clause {
        Clause::FuzzyName { text } => json!({
            "match": { "name": { "query": text, "fuzziness": "AUTO" } }
        }),
        Clause::TagMembership { dimension, slugs } => {
            let path = dimension.path();
            let field = format!("{}.slug", path);
            let should: Vec<Value> = slugs
                .iter()
                .map(|slug| json!({ "term": { (field.as_str()): slug } }))
                .collect();
            json!({
                "nested": {
                    "path": path,
                    "query": { "bool": { "should": should, "minimum_should_match": 1 } }
                }
            })
        }
        Clause::PriceRange { min, max } => {
            let mut range = serde_json::Map::new();
            if let Some(min) = min {
                range.insert("gte".to_string(), json!(min));
            }
            if let Some(max) = max {
                range.insert("lte".to_string(), json!(max));
            }
            json!({ "range": { "price": range } })
        }
        Clause::Status { value } => json!({ "term": { "status": value } }),
    }
}

fn render_sort(sort: Option<SortSpec>) -> Vec<Value> {
    sort.map(|spec| {
        let field = match spec.field {
            SortField::Name => "name.keyword",
            SortField::Price => "price",
            SortField::CreatedAt => "created_at",
        };
        json!({ field: { "order": spec.order.as_str() } })
    })
    .into_iter()
    .collect()
}

fn render_aggregations(limits: &FacetLimits) -> Value {
    let nested = |dimension: TagDimension, size: usize| {
        json!({
            "nested": { "path": dimension.path() },
            "aggs": {
                "by_slug": {
                    "terms": { "field": format!("{}.slug", dimension.path()), "size": size }
                }
            }
        })
    };

    json!({
        "categories": nested(TagDimension::Categories, limits.get(FacetDimension::Category)),
        "characters": nested(TagDimension::Characters, limits.get(FacetDimension::Character)),
        "statuses": { "terms": { "field": "status", "size": limits.get(FacetDimension::Status) } }
    })
}

/// Full `_search` request body
pub fn render_request(request: &SearchRequest) -> Value {
    let query = &request.query;
    json!({
        "from": query.offset,
        "size": query.size,
        "track_total_hits": true,
        "query": render_query(query),
        "sort": render_sort(query.sort),
        "aggs": render_aggregations(&request.facet_limits),
    })
}

/// Index settings and mappings for the product index
pub fn index_definition() -> Value {
    json!({
        "settings": {
            "analysis": {
                "filter": {
                    "autocomplete_filter": {
                        "type": "edge_ngram",
                        "min_gram": MIN_GRAM,
                        "max_gram": MAX_GRAM
                    }
                },
                "analyzer": {
                    "autocomplete": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "autocomplete_filter"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "price": { "type": "long" },
                "name": {
                    "type": "text",
                    "analyzer": "autocomplete",
                    "search_analyzer": "standard",
                    "fields": { "keyword": { "type": "keyword" } }
                },
                "images": { "type": "keyword" },
                "categories": tag_mapping(),
                "characters": tag_mapping(),
                "status": { "type": "keyword" },
                "created_at": { "type": "date" }
            }
        }
    })
}

fn tag_mapping() -> Value {
    json!({
        "type": "nested",
        "properties": {
            "name": { "type": "text", "analyzer": "standard" },
            "slug": { "type": "keyword" }
        }
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: Hits,
    #[serde(default)]
    aggregations: Value,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: Total,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Tracked { value: u64 },
    Legacy(u64),
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: IndexedProduct,
}

fn parse_search_response(body: Value) -> SearchResult<RawSearchResponse> {
    let parsed: SearchResponseBody = serde_json::from_value(body)
        .map_err(|e| SearchError::QueryFailed(format!("Malformed search response: {}", e)))?;

    let total = match parsed.hits.total {
        Total::Tracked { value } | Total::Legacy(value) => value,
    };

    let aggs = &parsed.aggregations;
    let aggregations = FacetAggregations {
        categories: parse_buckets(aggs.pointer("/categories/by_slug/buckets")),
        characters: parse_buckets(aggs.pointer("/characters/by_slug/buckets")),
        statuses: parse_buckets(aggs.pointer("/statuses/buckets")),
    };

    Ok(RawSearchResponse {
        hits: parsed.hits.hits.into_iter().map(|hit| hit.source).collect(),
        total,
        aggregations,
    })
}

fn parse_buckets(buckets: Option<&Value>) -> Vec<FacetBucket> {
    buckets
        .and_then(Value::as_array)
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| {
                    let key = match bucket.get("key")? {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let count = bucket.get("doc_count")?.as_u64()?;
                    Some(FacetBucket::new(key, count))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn error_type(body: &Value) -> Option<&str> {
    body.pointer("/error/type").and_then(Value::as_str)
}

fn engine_error(status: StatusCode, body: &Value) -> SearchError {
    let message = body
        .pointer("/error/reason")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| match body {
            Value::String(s) => s.clone(),
            Value::Null => status.canonical_reason().unwrap_or("no response body").to_string(),
            other => other.to_string(),
        });

    SearchError::EngineResponse {
        status: status.as_u16(),
        message,
    }
}
