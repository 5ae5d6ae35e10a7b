use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::gateway::error::GatewayError;
use crate::gateway::payload::{InvokeRequest, ProductSearchResponse, ResolveRequest, SearchParams};
use crate::gateway::state::HandlerState;
use crate::model::PINPOINT_SOURCE_HEADER;
use crate::upstream::SearchBackend;

/// Supported `POST /shop/invoke` operation.
const OP_FIND_PRODUCTS_MULTI: &str = "find_products_multi";

#[instrument(skip(state, request), fields(lang = tracing::field::Empty))]
pub async fn resolve_handler<B>(
    State(state): State<HandlerState<B>>,
    Json(request): Json<ResolveRequest>,
) -> Result<Response, GatewayError>
where
    B: SearchBackend + 'static,
{
    if let Some(lang) = &request.lang {
        tracing::Span::current().record("lang", tracing::field::display(lang));
    }

    let query = request.query.as_deref().unwrap_or("");
    let options = request.options.unwrap_or_default();
    let result = state
        .resolver
        .resolve(query, request.hints.as_ref(), &options)
        .await?;

    debug!(
        resolved = result.resolved,
        reason = %result.reason_code,
        "resolve request finished"
    );

    let headers = source_header(
        result
            .metadata
            .query_source
            .as_deref()
            .unwrap_or(result.reason_code.as_str()),
    );
    Ok((headers, Json(result)).into_response())
}

#[instrument(skip(state, params), fields(lang = tracing::field::Empty))]
pub async fn search_handler<B>(
    State(state): State<HandlerState<B>>,
    Query(params): Query<SearchParams>,
) -> Result<Response, GatewayError>
where
    B: SearchBackend + 'static,
{
    if let Some(lang) = &params.lang {
        tracing::Span::current().record("lang", tracing::field::display(lang));
    }

    let query = params.query.as_deref().unwrap_or("");
    let options = params.resolve_options();
    let search = state
        .resolver
        .search_products(query, &options, params.limit(), params.offset())
        .await?;

    let headers = source_header(search.metadata.query_source.as_deref().unwrap_or("none"));
    Ok((headers, Json(ProductSearchResponse::from(search))).into_response())
}

#[instrument(skip(state, request), fields(operation = %request.operation))]
pub async fn invoke_handler<B>(
    State(state): State<HandlerState<B>>,
    Json(request): Json<InvokeRequest>,
) -> Result<Response, GatewayError>
where
    B: SearchBackend + 'static,
{
    if request.operation != OP_FIND_PRODUCTS_MULTI {
        return Err(GatewayError::UnknownOperation(request.operation));
    }

    let query = request.query.as_deref().unwrap_or("");
    let options = request.options.unwrap_or_default();
    let search = state.resolver.find_products_multi(query, &options).await?;

    let headers = source_header(search.metadata.query_source.as_deref().unwrap_or("none"));
    Ok((headers, Json(ProductSearchResponse::from(search))).into_response())
}

fn source_header(source: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        PINPOINT_SOURCE_HEADER,
        HeaderValue::from_str(source).unwrap_or(HeaderValue::from_static("error")),
    );
    headers
}
