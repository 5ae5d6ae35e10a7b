//! Router-level tests driving the handlers through `tower::ServiceExt`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{Router, body::Body, http::Request, http::StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::alias::AliasTable;
use crate::gateway::{HandlerState, create_router_with_state};
use crate::model::{PINPOINT_SOURCE_HEADER, SourceType};
use crate::resolver::{Resolver, ResolverConfig};
use crate::scoring::RelevanceScorer;
use crate::store::{
    CachedProduct, CatalogSnapshot, CatalogStore, MerchantApproval, ProductStatus,
};
use crate::upstream::MockSearchBackend;

fn fixture_snapshot() -> CatalogSnapshot {
    let products = vec![CachedProduct {
        merchant_id: "shopa".to_string(),
        product_id: "55".to_string(),
        title: "Gentle Foaming Cleanser".to_string(),
        brand: Some("PureSkin".to_string()),
        status: ProductStatus::Published,
        in_stock: true,
        source_type: SourceType::Catalog,
    }];
    let approvals: HashMap<String, MerchantApproval> = products
        .iter()
        .map(|p| {
            (
                p.merchant_id.clone(),
                MerchantApproval {
                    approved: true,
                    approved_at: Some(Utc::now()),
                },
            )
        })
        .collect();
    CatalogSnapshot {
        products,
        approvals,
        refreshed_at: Utc::now(),
    }
}

fn router_with(snapshot: CatalogSnapshot) -> (Router, MockSearchBackend) {
    let mock = MockSearchBackend::new();
    let resolver = Resolver::new(
        Arc::new(AliasTable::curated()),
        Arc::new(CatalogStore::new(snapshot)),
        mock.clone(),
        RelevanceScorer::default(),
        ResolverConfig::default(),
    );
    let router = create_router_with_state(HandlerState::new(Arc::new(resolver)));
    (router, mock)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_healthz_returns_ok() {
    let (router, _mock) = router_with(fixture_snapshot());
    let response = router
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_ready_reports_components() {
    let (router, _mock) = router_with(fixture_snapshot());
    let response = router
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["components"]["alias_table"], "ready");
    assert_eq!(body["components"]["catalog_cache"], "ready");
}

#[tokio::test]
async fn test_ready_is_pending_with_empty_catalog() {
    let (router, _mock) = router_with(CatalogSnapshot::empty());
    let response = router
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["components"]["catalog_cache"], "pending");
}

#[tokio::test]
async fn test_resolve_alias_hit_sets_source_header() {
    let (router, mock) = router_with(fixture_snapshot());
    let request = post_json(
        "/products/resolve",
        serde_json::json!({"query": "The Ordinary Niacinamide 10% + Zinc 1%"}),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(PINPOINT_SOURCE_HEADER).unwrap(),
        "stable_alias_ref"
    );
    let body = json_body(response).await;
    assert_eq!(body["resolved"], true);
    assert_eq!(body["product_ref"]["merchant_id"], "glowmart");
    assert_eq!(body["product_ref"]["product_id"], "1043912");
    assert_eq!(body["metadata"]["stable_alias_match_id"], "the-ordinary-niacinamide-10-zinc-1");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_resolve_missing_query_is_a_400() {
    let (router, _mock) = router_with(fixture_snapshot());
    let request = post_json("/products/resolve", serde_json::json!({}));
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(PINPOINT_SOURCE_HEADER).unwrap(),
        "MISSING_PARAMETERS"
    );
    let body = json_body(response).await;
    assert_eq!(body["code"], "MISSING_PARAMETERS");
}

#[tokio::test]
async fn test_resolve_cache_hit_resolves_without_network() {
    let (router, mock) = router_with(fixture_snapshot());
    let request = post_json(
        "/products/resolve",
        serde_json::json!({"query": "gentle foaming cleanser"}),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(PINPOINT_SOURCE_HEADER).unwrap(),
        "cache_cross_merchant_search"
    );
    let body = json_body(response).await;
    assert_eq!(body["resolved"], true);
    assert_eq!(body["product_ref"]["product_id"], "55");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_resolve_empty_everywhere_reports_no_candidates() {
    let (router, _mock) = router_with(CatalogSnapshot::empty());
    let request = post_json(
        "/products/resolve",
        serde_json::json!({"query": "nonexistent gadget xyz"}),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["resolved"], false);
    assert_eq!(body["reason_code"], "no_candidates");
    assert!(body["metadata"]["sources"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn test_search_serves_live_results_with_paging() {
    let (router, mock) = router_with(CatalogSnapshot::empty());
    mock.push_search(Ok(vec![
        MockSearchBackend::row("m1", "a", "Red Canvas High Top Sneakers", None),
        MockSearchBackend::row("m2", "b", "Red Canvas Sneakers", None),
        MockSearchBackend::row("m3", "c", "Canvas Sneakers", None),
    ]));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/products/search?query=red+canvas+high+top+sneakers&limit=2&offset=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(PINPOINT_SOURCE_HEADER).unwrap(),
        "catalog_search_global"
    );
    let body = json_body(response).await;
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["product_ref"]["product_id"], "b");
    assert_eq!(body["metadata"]["proxy_search_fallback"]["reason"], "not_needed");
}

#[tokio::test]
async fn test_search_accepts_the_short_q_param() {
    let (router, mock) = router_with(CatalogSnapshot::empty());
    mock.push_search(Ok(vec![MockSearchBackend::row(
        "m1",
        "a",
        "Waterproof Hiking Boots",
        None,
    )]));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/products/search?q=waterproof+hiking+boots&lang=en-US")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(PINPOINT_SOURCE_HEADER).unwrap(),
        "catalog_search_global"
    );
    let body = json_body(response).await;
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_falls_back_to_resolver_when_primary_is_irrelevant() {
    let (router, mock) = router_with(fixture_snapshot());
    mock.push_search(Ok(vec![MockSearchBackend::row(
        "m9",
        "z",
        "Garden Hose Reel",
        None,
    )]));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/products/search?query=gentle+foaming+cleanser")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(PINPOINT_SOURCE_HEADER).unwrap(),
        "agent_products_resolver_fallback"
    );
    let body = json_body(response).await;
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["metadata"]["proxy_search_fallback"]["applied"], true);
    assert_eq!(
        body["metadata"]["proxy_search_fallback"]["reason"],
        "resolver_after_primary"
    );
}

#[tokio::test]
async fn test_search_missing_query_is_a_400() {
    let (router, _mock) = router_with(fixture_snapshot());
    let response = router
        .oneshot(
            Request::builder()
                .uri("/products/search")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "MISSING_PARAMETERS");
}

#[tokio::test]
async fn test_invoke_find_products_multi_cache_first() {
    let (router, mock) = router_with(fixture_snapshot());
    let request = post_json(
        "/shop/invoke",
        serde_json::json!({
            "operation": "find_products_multi",
            "query": "gentle foaming cleanser"
        }),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(PINPOINT_SOURCE_HEADER).unwrap(),
        "cache_cross_merchant_search"
    );
    let body = json_body(response).await;
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_invoke_unknown_operation_is_a_400() {
    let (router, _mock) = router_with(fixture_snapshot());
    let request = post_json(
        "/shop/invoke",
        serde_json::json!({"operation": "drop_tables", "query": "x"}),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "UNKNOWN_OPERATION");
}
