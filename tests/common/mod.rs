//! Shared fixtures for the router-level integration suites.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{Router, body::Body, http::Request};
use chrono::Utc;
use http_body_util::BodyExt;

use pinpoint::alias::AliasTable;
use pinpoint::gateway::{HandlerState, create_router_with_state};
use pinpoint::model::SourceType;
use pinpoint::resolver::{Resolver, ResolverConfig};
use pinpoint::scoring::RelevanceScorer;
use pinpoint::store::{
    CachedProduct, CatalogSnapshot, CatalogStore, MerchantApproval, ProductStatus,
};
use pinpoint::upstream::MockSearchBackend;

pub fn product(merchant: &str, id: &str, title: &str, brand: Option<&str>) -> CachedProduct {
    CachedProduct {
        merchant_id: merchant.to_string(),
        product_id: id.to_string(),
        title: title.to_string(),
        brand: brand.map(String::from),
        status: ProductStatus::Published,
        in_stock: true,
        source_type: SourceType::Catalog,
    }
}

pub fn snapshot(products: Vec<CachedProduct>) -> CatalogSnapshot {
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

pub fn router_with(snapshot: CatalogSnapshot) -> (Router, MockSearchBackend) {
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

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
