//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which engine backs the search service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Embedded Tantivy index
    #[default]
    Tantivy,
    /// Remote Elasticsearch cluster
    Elasticsearch,
}

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Engine implementation
    #[serde(default)]
    pub engine: EngineKind,

    /// Directory of the embedded index; `None` keeps the index in RAM
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Index writer heap size in bytes (default: 50MB)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Page size used when the caller does not provide one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound applied to caller-provided page sizes at the HTTP layer
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Bucket cap for the category and character dimensions
    #[serde(default = "default_facet_bucket_limit")]
    pub facet_bucket_limit: usize,

    /// Bucket cap for the status dimension
    #[serde(default = "default_status_bucket_limit")]
    pub status_bucket_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            index_path: None,
            writer_heap_size: default_writer_heap_size(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            facet_bucket_limit: default_facet_bucket_limit(),
            status_bucket_limit: default_status_bucket_limit(),
        }
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }
}

/// Elasticsearch connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster
    #[serde(default = "default_es_url")]
    pub url: String,

    /// Index holding product documents
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: default_es_url(),
            index_name: default_index_name(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = Some(path);
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.config.index_path = None;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn default_limit(mut self, limit: usize) -> Self {
        self.config.default_limit = limit;
        self
    }

    pub fn max_limit(mut self, limit: usize) -> Self {
        self.config.max_limit = limit;
        self
    }

    pub fn facet_bucket_limit(mut self, limit: usize) -> Self {
        self.config.facet_bucket_limit = limit;
        self
    }

    pub fn status_bucket_limit(mut self, limit: usize) -> Self {
        self.config.status_bucket_limit = limit;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_writer_heap_size() -> usize {
    50_000_000
}

fn default_limit() -> usize {
    24
}

fn default_max_limit() -> usize {
    100
}

fn default_facet_bucket_limit() -> usize {
    10_000
}

fn default_status_bucket_limit() -> usize {
    100
}

fn default_es_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index_name() -> String {
    "products".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.engine, EngineKind::Tantivy);
        assert!(config.index_path.is_none());
        assert_eq!(config.default_limit, 24);
        assert_eq!(config.facet_bucket_limit, 10_000);
        assert_eq!(config.status_bucket_limit, 100);
    }

    #[test]
    fn test_builder() {
        let config = SearchConfig::builder()
            .index_path(PathBuf::from("/tmp/products"))
            .facet_bucket_limit(50)
            .max_limit(10)
            .build();

        assert_eq!(config.index_path, Some(PathBuf::from("/tmp/products")));
        assert_eq!(config.facet_bucket_limit, 50);
        assert_eq!(config.max_limit, 10);
        assert!(SearchConfig::builder().index_path("/x".into()).in_memory().build().index_path.is_none());
    }
}
