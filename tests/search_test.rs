//! Faceted search against the embedded engine

mod common;

use catalog_search::search::*;
use common::{ram_engine, ProductBuilder};
use std::sync::Arc;
use tempfile::TempDir;

async fn seed(engine: &IndexManager, products: Vec<IndexedProduct>) {
    for product in products {
        engine.upsert(&product).await.unwrap();
    }
}

fn names(response: &SearchResponse) -> Vec<&str> {
    response.items.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn test_empty_index_returns_empty_page_and_facets() {
    let (_engine, service) = ram_engine().await;

    let response = service.search(&SearchFilter::new()).await.unwrap();

    assert!(response.items.is_empty());
    assert_eq!(response.total, 0);
    assert!(response.facets.is_empty());
    assert_eq!(response.page, 1);
    assert_eq!(response.limit, DEFAULT_PAGE_SIZE);
}

#[tokio::test]
async fn test_category_filter_zero_fills_excluded_values() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![
            ProductBuilder::new("p1", "Plush One").category("a").build(),
            ProductBuilder::new("p2", "Plush Two").category("a").build(),
            ProductBuilder::new("p3", "Mug").category("b").build(),
        ],
    )
    .await;

    let response = service
        .search(&SearchFilter::new().with_categories(vec!["a"]))
        .await
        .unwrap();

    assert_eq!(response.total, 2);
    assert_eq!(
        response.facets.categories,
        vec![FacetBucket::new("a", 2), FacetBucket::new("b", 0)]
    );
}

#[tokio::test]
async fn test_price_range_is_inclusive_window() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![
            ProductBuilder::new("cheap", "Sticker").price(5).build(),
            ProductBuilder::new("mid", "Keychain").price(15).build(),
            ProductBuilder::new("dear", "Figure").price(25).build(),
        ],
    )
    .await;

    let response = service
        .search(&SearchFilter::new().with_price_range(Some(10), Some(20)))
        .await
        .unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].id, "mid");

    let response = service
        .search(&SearchFilter::new().with_price_range(Some(15), Some(25)))
        .await
        .unwrap();
    assert_eq!(response.total, 2);
}

#[tokio::test]
async fn test_sort_by_name_descending() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![
            ProductBuilder::new("p1", "Apple").build(),
            ProductBuilder::new("p2", "Banana").build(),
        ],
    )
    .await;

    let response = service
        .search(&SearchFilter::new().with_sort("name", SortOrder::Desc))
        .await
        .unwrap();

    assert_eq!(names(&response), vec!["Banana", "Apple"]);
}

#[tokio::test]
async fn test_upsert_same_id_keeps_latest_payload() {
    let (engine, service) = ram_engine().await;

    engine
        .upsert(&ProductBuilder::new("p1", "Totoro Plush").price(1000).build())
        .await
        .unwrap();
    engine
        .upsert(&ProductBuilder::new("p1", "Totoro Plush").price(1500).build())
        .await
        .unwrap();

    let response = service.search(&SearchFilter::new()).await.unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].price, 1500);
}

#[tokio::test]
async fn test_deleting_unknown_id_succeeds() {
    let (engine, _service) = ram_engine().await;
    let indexer = ProductIndexer::new(engine.clone());

    assert_eq!(indexer.remove("ghost").await.unwrap(), DeleteOutcome::NotFound);

    engine
        .upsert(&ProductBuilder::new("p1", "Mug").build())
        .await
        .unwrap();
    assert_eq!(indexer.remove("p1").await.unwrap(), DeleteOutcome::Deleted);
    assert_eq!(indexer.remove("p1").await.unwrap(), DeleteOutcome::NotFound);
}

#[tokio::test]
async fn test_pagination_keeps_full_total() {
    let (engine, service) = ram_engine().await;
    let products = (1..=7)
        .map(|i| {
            ProductBuilder::new(&format!("p{}", i), &format!("Badge {}", i))
                .price(i * 100)
                .build()
        })
        .collect();
    seed(&engine, products).await;

    let mut seen = Vec::new();
    for page in 1..=3 {
        let response = service
            .search(
                &SearchFilter::new()
                    .with_sort("price", SortOrder::Asc)
                    .with_page(page, 3),
            )
            .await
            .unwrap();

        assert_eq!(response.total, 7);
        assert!(response.items.len() <= 3);
        seen.extend(response.items.into_iter().map(|p| p.price));
    }

    assert_eq!(seen, vec![100, 200, 300, 400, 500, 600, 700]);
}

#[tokio::test]
async fn test_zero_fill_across_every_dimension() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![
            ProductBuilder::new("p1", "Catbus Mug")
                .category("mugs")
                .character("catbus")
                .status("active")
                .build(),
            ProductBuilder::new("p2", "Totoro Plush")
                .category("plush")
                .character("totoro")
                .status("draft")
                .build(),
        ],
    )
    .await;

    let response = service
        .search(&SearchFilter::new().with_characters(vec!["totoro"]))
        .await
        .unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(
        response.facets.categories,
        vec![FacetBucket::new("mugs", 0), FacetBucket::new("plush", 1)]
    );
    assert_eq!(
        response.facets.characters,
        vec![FacetBucket::new("catbus", 0), FacetBucket::new("totoro", 1)]
    );
    assert_eq!(
        response.facets.statuses,
        vec![FacetBucket::new("active", 0), FacetBucket::new("draft", 1)]
    );
}

#[tokio::test]
async fn test_filters_combine_as_conjunction() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![
            ProductBuilder::new("p1", "Totoro Plush")
                .category("plush")
                .character("totoro")
                .price(2500)
                .build(),
            ProductBuilder::new("p2", "Totoro Mug")
                .category("mugs")
                .character("totoro")
                .price(1800)
                .build(),
            ProductBuilder::new("p3", "Jiji Plush")
                .category("plush")
                .character("jiji")
                .price(2200)
                .status("archived")
                .build(),
        ],
    )
    .await;

    let filter = SearchFilter::new()
        .with_name("totoro")
        .with_categories(vec!["plush", "mugs"])
        .with_price_range(Some(2000), None)
        .with_status("active");

    let response = service.search(&filter).await.unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].id, "p1");
}

#[tokio::test]
async fn test_fuzzy_name_tolerates_typos_and_prefixes() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![
            ProductBuilder::new("p1", "Totoro Plush").build(),
            ProductBuilder::new("p2", "Catbus Mug").build(),
        ],
    )
    .await;

    let prefix = service
        .search(&SearchFilter::new().with_name("tot"))
        .await
        .unwrap();
    assert_eq!(names(&prefix), vec!["Totoro Plush"]);

    let typo = service
        .search(&SearchFilter::new().with_name("totoor"))
        .await
        .unwrap();
    assert_eq!(names(&typo), vec!["Totoro Plush"]);
}

#[tokio::test]
async fn test_unknown_sort_key_falls_back_to_default_order() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![
            ProductBuilder::new("p1", "Apple").build(),
            ProductBuilder::new("p2", "Banana").build(),
        ],
    )
    .await;

    let response = service
        .search(&SearchFilter::new().with_sort("popularity", SortOrder::Desc))
        .await
        .unwrap();

    assert_eq!(response.total, 2);
    assert_eq!(response.items.len(), 2);
}

#[tokio::test]
async fn test_repeated_search_is_deterministic() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![
            ProductBuilder::new("p1", "Mug").category("mugs").build(),
            ProductBuilder::new("p2", "Plush").category("plush").build(),
            ProductBuilder::new("p3", "Pin").category("pins").build(),
        ],
    )
    .await;

    let filter = SearchFilter::new().with_categories(vec!["pins"]);
    let first = service.search(&filter).await.unwrap();
    let second = service.search(&filter).await.unwrap();

    assert_eq!(first.facets, second.facets);
    assert_eq!(first.facets.categories.len(), 3);
}

#[tokio::test]
async fn test_on_disk_index_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = SearchConfig::builder()
        .index_path(dir.path().to_path_buf())
        .build();

    {
        let engine = IndexManager::new(&config).await.unwrap();
        engine
            .upsert(&ProductBuilder::new("p1", "Kiki Broom").price(900).build())
            .await
            .unwrap();
    }

    let engine = Arc::new(IndexManager::new(&config).await.unwrap());
    let service = SearchService::new(engine, &config);
    let response = service.search(&SearchFilter::new()).await.unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].name, "Kiki Broom");
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let (engine, service) = ram_engine().await;
    seed(
        &engine,
        vec![ProductBuilder::new("p1", "Totoro Plush").category("plush").build()],
    )
    .await;

    let response = service
        .search(&SearchFilter::new().with_page(1_000_000_000_000, 24))
        .await
        .unwrap();

    assert!(response.items.is_empty());
    assert_eq!(response.total, 1);
    assert_eq!(response.page, 1_000_000_000_000);
    assert_eq!(response.facets.categories, vec![FacetBucket::new("plush", 1)]);

    let response = service
        .search(&SearchFilter::new().with_page(usize::MAX, usize::MAX))
        .await
        .unwrap();
    assert!(response.items.is_empty());
    assert_eq!(response.total, 1);
}

#[tokio::test]
async fn test_blank_tag_slugs_never_reach_the_index() {
    let (engine, service) = ram_engine().await;
    let indexer = ProductIndexer::new(engine);

    let payload: ProductPayload = serde_json::from_value(serde_json::json!({
        "id": "p1",
        "name": "Totoro Plush",
        "price": 2500,
        "status": "active",
        "created_at": "2024-02-01T12:00:00Z",
        "categories": [
            {"name": "Blank", "slug": ""},
            {"name": "Plush", "slug": "plush"}
        ]
    }))
    .unwrap();

    let stored = indexer.upsert(payload).await.unwrap();
    assert_eq!(stored.category_slugs(), vec!["plush"]);

    let response = service.search(&SearchFilter::new()).await.unwrap();
    assert_eq!(response.facets.categories, vec![FacetBucket::new("plush", 1)]);
    assert_eq!(response.items[0].categories, stored.categories);
}
