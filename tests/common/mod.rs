//! Shared fixtures for integration tests

#![allow(dead_code)]

use catalog_search::search::{IndexManager, IndexedProduct, SearchConfig, SearchService, Tag};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Fluent builder for catalog products
pub struct ProductBuilder {
    product: IndexedProduct,
}

impl ProductBuilder {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            product: IndexedProduct {
                id: id.to_string(),
                name: name.to_string(),
                price: 1000,
                status: "active".to_string(),
                created_at: day(1),
                images: Vec::new(),
                categories: Vec::new(),
                characters: Vec::new(),
            },
        }
    }

    pub fn price(mut self, price: u64) -> Self {
        self.product.price = price;
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.product.status = status.to_string();
        self
    }

    pub fn created_on(mut self, day_of_month: u32) -> Self {
        self.product.created_at = day(day_of_month);
        self
    }

    pub fn category(mut self, slug: &str) -> Self {
        self.product.categories.push(Tag::new(title(slug), slug));
        self
    }

    pub fn character(mut self, slug: &str) -> Self {
        self.product.characters.push(Tag::new(title(slug), slug));
        self
    }

    pub fn build(self) -> IndexedProduct {
        self.product
    }
}

/// Midnight UTC on the given day of January 2024
pub fn day(day_of_month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day_of_month, 0, 0, 0).unwrap()
}

fn title(slug: &str) -> String {
    let mut chars = slug.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// In-RAM engine plus a service over it
pub async fn ram_engine() -> (Arc<IndexManager>, SearchService) {
    let config = SearchConfig::builder().in_memory().build();
    let engine = Arc::new(IndexManager::new(&config).await.unwrap());
    let service = SearchService::new(engine.clone(), &config);
    (engine, service)
}

/// Parse Prometheus exposition text into metric name -> lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 {
                current_metric = parts[2].to_string();
                metrics
                    .entry(current_metric.clone())
                    .or_insert_with(Vec::new)
                    .push(line.to_string());
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}
