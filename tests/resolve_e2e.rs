//! End-to-end resolution flows over `POST /products/resolve`.

mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use common::{get, json_body, post_json, product, router_with, snapshot};
use pinpoint::model::PINPOINT_SOURCE_HEADER;
use pinpoint::store::CatalogSnapshot;
use pinpoint::upstream::{MockSearchBackend, UpstreamError};

#[tokio::test]
async fn test_the_ordinary_alias_resolves_end_to_end() {
    let (router, mock) = router_with(CatalogSnapshot::empty());
    let response = router
        .oneshot(post_json(
            "/products/resolve",
            serde_json::json!({
                "query": "The Ordinary Niacinamide 10% + Zinc 1%",
                "lang": "en-US"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(PINPOINT_SOURCE_HEADER).unwrap(),
        "stable_alias_ref"
    );
    let body = json_body(response).await;
    assert_eq!(body["resolved"], true);
    assert_eq!(body["confidence"], 1.0);
    assert_eq!(body["product_ref"]["merchant_id"], "glowmart");
    assert_eq!(body["product_ref"]["product_id"], "1043912");
    assert_eq!(body["reason_code"], "stable_alias_ref");
    // No budget was consumed on the network.
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_trusted_hint_reference_bypasses_the_cascade() {
    let (router, mock) = router_with(CatalogSnapshot::empty());
    let response = router
        .oneshot(post_json(
            "/products/resolve",
            serde_json::json!({
                "query": "some serum",
                "hints": {"product_ref": {"product_id": "1043912"}}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["resolved"], true);
    assert_eq!(body["reason_code"], "hints_product_ref");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_opaque_hint_reference_downgrades_to_lookup() {
    let (router, mock) = router_with(CatalogSnapshot::empty());
    mock.push_search(Ok(vec![MockSearchBackend::row(
        "m1",
        "7",
        "Acme Widget",
        Some("Acme"),
    )]));
    let response = router
        .oneshot(post_json(
            "/products/resolve",
            serde_json::json!({
                "query": "acme widget",
                "hints": {
                    "product_ref": {
                        "merchant_id": "m1",
                        "product_id": "6f9619ff-8b86-d011-b42d-00c04fc964ff"
                    }
                }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    // The opaque ID was not trusted; the cascade found the product by query.
    assert_eq!(body["resolved"], true);
    assert_eq!(body["reason_code"], "catalog_search_global");
    let sources = body["metadata"]["sources"].as_array().unwrap();
    assert_eq!(sources[0]["source"], "hints_product_ref");
    assert_eq!(sources[0]["ok"], false);
    assert_eq!(sources[0]["reason"], "opaque_hint_requires_lookup");
    assert!(mock.search_call_count() >= 1);
}

#[tokio::test]
async fn test_cache_hit_short_circuits_before_the_network() {
    let (router, mock) = router_with(snapshot(vec![product(
        "shopa",
        "55",
        "Gentle Foaming Cleanser",
        Some("PureSkin"),
    )]));
    let response = router
        .oneshot(post_json(
            "/products/resolve",
            serde_json::json!({"query": "gentle foaming cleanser"}),
        ))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["resolved"], true);
    assert_eq!(body["reason_code"], "cache_cross_merchant_search");
    assert_eq!(mock.search_call_count(), 0);
}

#[tokio::test]
async fn test_shell_row_primary_falls_through_and_still_resolves() {
    let (router, _mock) = {
        let (router, mock) = router_with(CatalogSnapshot::empty());
        mock.push_search(Ok(vec![
            MockSearchBackend::shell_row(),
            MockSearchBackend::shell_row(),
        ]));
        mock.push_invoke(Ok(vec![MockSearchBackend::row(
            "m2",
            "9",
            "Acme Widget",
            Some("Acme"),
        )]));
        (router, mock)
    };
    let response = router
        .oneshot(post_json(
            "/products/resolve",
            serde_json::json!({"query": "acme widget"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["resolved"], true);
    assert_eq!(body["reason_code"], "multi_merchant_invoke");
    let sources = body["metadata"]["sources"].as_array().unwrap();
    let global = sources
        .iter()
        .find(|s| s["source"] == "catalog_search_global")
        .unwrap();
    assert_eq!(global["ok"], false);
}

#[tokio::test]
async fn test_mid_band_ambiguity_returns_a_clarification() {
    let (router, _mock) = router_with(snapshot(vec![
        product("m1", "1", "Blue Widget Pro", None),
        product("m2", "2", "Blue Widget Pro Max", None),
        product("m3", "3", "Blue Widget", None),
    ]));
    let response = router
        .oneshot(post_json(
            "/products/resolve",
            serde_json::json!({"query": "blue widget pro"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["resolved"], false);
    assert_eq!(body["reason_code"], "ambiguous");
    assert!(body["clarification"]["question"].as_str().unwrap().len() > 0);
    assert_eq!(body["metadata"]["route_health"]["clarify_triggered"], true);
    assert_eq!(body["metadata"]["search_trace"]["final_decision"], "clarify");
}

#[tokio::test]
async fn test_upstream_failure_yields_db_timeout_not_a_500() {
    let (router, mock) = router_with(CatalogSnapshot::empty());
    mock.push_search(Err(UpstreamError::Transport("reset".to_string())));
    mock.push_search(Err(UpstreamError::Transport("reset".to_string())));
    let response = router
        .oneshot(post_json(
            "/products/resolve",
            serde_json::json!({
                "query": "acme widget",
                "options": {"timeout_ms": 40}
            }),
        ))
        .await
        .unwrap();

    // Dependency failures are absorbed: the caller sees a well-formed empty.
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["resolved"], false);
    assert_eq!(body["reason_code"], "db_timeout");
}

#[tokio::test]
async fn test_health_endpoints() {
    let (router, _mock) = router_with(snapshot(vec![product("m1", "1", "Widget", None)]));
    let response = router.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
