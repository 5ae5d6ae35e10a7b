//! Request/response wire shapes for the gateway routes.

use serde::{Deserialize, Serialize};

use crate::model::{Clarification, HintBundle, ResolutionCandidate, ResolutionMetadata, ResolveOptions};
use crate::resolver::ProductSearch;

/// Body of `POST /products/resolve`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub query: Option<String>,
    /// BCP-47 tag of the caller's locale. Logged, not used for matching.
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub hints: Option<HintBundle>,
    #[serde(default)]
    pub options: Option<ResolveOptions>,
}

/// Query string of `GET /products/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    /// Accepted as `query` or the short `q` form.
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    /// BCP-47 tag of the caller's locale. Logged, not used for matching.
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    /// Comma-separated merchant IDs to prefer.
    #[serde(default)]
    pub merchants: Option<String>,
    #[serde(default)]
    pub in_stock_only: Option<bool>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Default page size on the search route.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

impl SearchParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            prefer_merchants: self
                .merchants
                .as_deref()
                .map(|m| {
                    m.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            timeout_ms: self.timeout_ms,
            in_stock_only: self.in_stock_only.unwrap_or(false),
            ..Default::default()
        }
    }
}

/// Body of `POST /shop/invoke`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeRequest {
    pub operation: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub options: Option<ResolveOptions>,
}

/// Product-list response shared by the search and invoke routes.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSearchResponse {
    pub products: Vec<ResolutionCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<Clarification>,
    pub metadata: ResolutionMetadata,
}

impl From<ProductSearch> for ProductSearchResponse {
    fn from(search: ProductSearch) -> Self {
        Self {
            products: search.products,
            clarification: search.clarification,
            metadata: search.metadata,
        }
    }
}
