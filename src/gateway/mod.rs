//! HTTP gateway (Axum) for the resolution and search routes.

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;

#[cfg(test)]
mod handler_tests;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{invoke_handler, resolve_handler, search_handler};
pub use state::HandlerState;

use crate::model::PINPOINT_SOURCE_HEADER;
use crate::upstream::SearchBackend;

const STATUS_READY: &str = "ready";
const STATUS_PENDING: &str = "pending";

pub fn create_router_with_state<B>(state: HandlerState<B>) -> Router
where
    B: SearchBackend + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/products/resolve", post(resolve_handler))
        .route("/products/search", get(search_handler))
        .route("/shop/invoke", post(invoke_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub alias_table: &'static str,
    pub catalog_cache: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(PINPOINT_SOURCE_HEADER, HeaderValue::from_static("healthy"));

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

/// Readiness gates on the catalog cache having been populated at least once;
/// the alias table is built in-process and can only be empty by mistake.
#[tracing::instrument(skip(state))]
pub async fn ready_handler<B>(State(state): State<HandlerState<B>>) -> Response
where
    B: SearchBackend + 'static,
{
    let alias_status = if state.resolver.alias_len() > 0 {
        STATUS_READY
    } else {
        STATUS_PENDING
    };
    let catalog_status = if state.resolver.store().product_count() > 0 {
        STATUS_READY
    } else {
        STATUS_PENDING
    };

    let components = ComponentStatus {
        http: STATUS_READY,
        alias_table: alias_status,
        catalog_cache: catalog_status,
    };

    let is_ready =
        components.alias_table == STATUS_READY && components.catalog_cache == STATUS_READY;

    let status_code = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status_msg = if is_ready { "ok" } else { STATUS_PENDING };

    let mut headers = HeaderMap::new();
    headers.insert(
        PINPOINT_SOURCE_HEADER,
        HeaderValue::from_str(status_msg).unwrap_or(HeaderValue::from_static("error")),
    );

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
