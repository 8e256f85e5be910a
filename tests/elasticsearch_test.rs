//! Elasticsearch engine against a mocked REST API

mod common;

use catalog_search::search::*;
use common::ProductBuilder;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;

fn backend(server: &ServerGuard) -> ElasticsearchBackend {
    ElasticsearchBackend::new(&ElasticsearchConfig {
        url: server.url(),
        index_name: "products".to_string(),
        request_timeout_secs: 5,
    })
    .unwrap()
}

fn hit(id: &str, name: &str, price: u64) -> serde_json::Value {
    json!({
        "_id": id,
        "_source": {
            "id": id,
            "name": name,
            "price": price,
            "status": "active",
            "created_at": "2024-01-01T00:00:00Z",
            "images": [],
            "categories": [{"name": "Plush", "slug": "plush"}],
            "characters": []
        }
    })
}

#[tokio::test]
async fn test_two_pass_search_merges_facets() {
    let mut server = Server::new_async().await;

    let universe = server
        .mock("POST", "/products/_search")
        .match_body(Matcher::PartialJson(json!({
            "size": 0,
            "query": {"match_all": {}}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "hits": {"total": {"value": 3}, "hits": []},
                "aggregations": {
                    "categories": {"by_slug": {"buckets": [
                        {"key": "plush", "doc_count": 2},
                        {"key": "mugs", "doc_count": 1}
                    ]}},
                    "characters": {"by_slug": {"buckets": []}},
                    "statuses": {"buckets": [{"key": "active", "doc_count": 3}]}
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let filtered = server
        .mock("POST", "/products/_search")
        .match_body(Matcher::PartialJson(json!({"from": 0, "size": 24})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "hits": {
                    "total": {"value": 2},
                    "hits": [hit("p1", "Totoro Plush", 2500), hit("p2", "Jiji Plush", 2200)]
                },
                "aggregations": {
                    "categories": {"by_slug": {"buckets": [{"key": "plush", "doc_count": 2}]}},
                    "characters": {"by_slug": {"buckets": []}},
                    "statuses": {"buckets": [{"key": "active", "doc_count": 2}]}
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let config = SearchConfig::default();
    let service = SearchService::new(Arc::new(backend(&server)), &config);

    let response = service
        .search(&SearchFilter::new().with_categories(vec!["plush"]))
        .await
        .unwrap();

    universe.assert_async().await;
    filtered.assert_async().await;

    assert_eq!(response.total, 2);
    assert_eq!(response.items[0].id, "p1");
    assert_eq!(
        response.facets.categories,
        vec![FacetBucket::new("plush", 2), FacetBucket::new("mugs", 0)]
    );
    assert_eq!(response.facets.statuses, vec![FacetBucket::new("active", 2)]);
}

#[tokio::test]
async fn test_engine_error_message_is_surfaced() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/products/_search")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": {"type": "search_phase_execution_exception", "reason": "all shards failed"},
                "status": 500
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = SearchService::new(Arc::new(backend(&server)), &SearchConfig::default());
    let err = service.search(&SearchFilter::new()).await.unwrap_err();

    match err {
        SearchError::EngineResponse { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "all shards failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_upsert_puts_document_with_refresh() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/products/_doc/p1")
        .match_query(Matcher::UrlEncoded("refresh".into(), "wait_for".into()))
        .match_body(Matcher::PartialJson(json!({"id": "p1", "price": 1500})))
        .with_status(200)
        .with_body(r#"{"result":"updated"}"#)
        .create_async()
        .await;

    backend(&server)
        .upsert(&ProductBuilder::new("p1", "Totoro Plush").price(1500).build())
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_missing_document_is_not_an_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("DELETE", "/products/_doc/ghost")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"result":"not_found"}"#)
        .create_async()
        .await;

    let outcome = backend(&server).delete("ghost").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn test_provision_is_idempotent() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("PUT", "/products")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": {"type": "resource_already_exists_exception", "reason": "index [products] already exists"},
                "status": 400
            })
            .to_string(),
        )
        .create_async()
        .await;

    assert!(!backend(&server).provision().await.unwrap());
}

#[tokio::test]
async fn test_unreachable_cluster_is_a_transport_error() {
    let backend = ElasticsearchBackend::new(&ElasticsearchConfig {
        url: "http://127.0.0.1:9".to_string(),
        index_name: "products".to_string(),
        request_timeout_secs: 2,
    })
    .unwrap();

    let err = backend.delete("p1").await.unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)));
}
