use crate::api::AppState;
use crate::error::Result;
use crate::metrics::gather_metrics;
use crate::search::{SearchFilter, SearchResponse, SortOrder};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(&state, "healthy"))
}

/// Readiness: the engine answers a facet-only query
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    match state.search.universe_pass().await {
        Ok(_) => Json(HealthResponse::new(&state, "ready")).into_response(),
        Err(e) => {
            tracing::warn!(engine = state.search.backend_name(), error = %e, "Search engine not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new(&state, "unavailable")),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub engine: String,
    pub uptime_seconds: u64,
}

impl HealthResponse {
    fn new(state: &AppState, status: &str) -> Self {
        Self {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine: state.search.backend_name().to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
        }
    }
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
        .into_response()
}

/// Faceted product search
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    params.validate()?;

    let filter = params.into_filter(state.default_limit, state.max_limit);
    filter.validate()?;

    let response = state.search.search(&filter).await?;
    Ok(Json(response))
}

/// Raw query string of `GET /v1/search`
///
/// Everything arrives as text; [`SearchParams::into_filter`] decides what is
/// usable.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    pub category_slug: Option<String>,
    pub character_slug: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl SearchParams {
    /// Blank or unparsable values become absent. `limit` is capped at
    /// `max_limit`.
    pub fn into_filter(self, default_limit: usize, max_limit: usize) -> SearchFilter {
        let limit = positive(self.limit.as_deref())
            .unwrap_or(default_limit)
            .min(max_limit.max(1));

        SearchFilter {
            name: text(self.name),
            category_slugs: slug_list(self.category_slug.as_deref()),
            character_slugs: slug_list(self.character_slug.as_deref()),
            min_price: number(self.min_price.as_deref()),
            max_price: number(self.max_price.as_deref()),
            status: text(self.status),
            page: positive(self.page.as_deref()).unwrap_or(1),
            limit,
            sort_by: text(self.sort_by),
            sort_order: self
                .sort_order
                .as_deref()
                .and_then(|raw| SortOrder::from_str(raw.trim()).ok())
                .unwrap_or_default(),
        }
    }
}

fn text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn number(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn positive(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse().ok()).filter(|n| *n > 0)
}

fn slug_list(raw: Option<&str>) -> Option<Vec<String>> {
    let slugs: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if slugs.is_empty() {
        None
    } else {
        Some(slugs)
    }
}
