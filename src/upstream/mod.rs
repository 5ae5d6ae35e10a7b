//! Live search upstreams: primary catalog search, secondary multi-merchant
//! invoke, and product-detail hydration.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


use std::time::Duration;

pub use client::CatalogSearchClient;
pub use error::{UpstreamError, UpstreamResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockSearchBackend, RecordedCall};
pub use model::{SearchResponse, SearchScope, UpstreamRow, usable_rows};

use crate::model::ProductRef;

/// Backend required by the cascade for its network stages.
pub trait SearchBackend: Send + Sync {
    /// Live catalog search, scoped or global.
    fn search(
        &self,
        query: &str,
        scope: &SearchScope,
        timeout: Duration,
    ) -> impl Future<Output = UpstreamResult<Vec<UpstreamRow>>> + Send;

    /// Secondary multi-merchant entry point.
    fn invoke_multi(
        &self,
        query: &str,
        timeout: Duration,
    ) -> impl Future<Output = UpstreamResult<Vec<UpstreamRow>>> + Send;

    /// Hydrates a bare reference into a full product row.
    fn product_detail(
        &self,
        product_ref: &ProductRef,
        timeout: Duration,
    ) -> impl Future<Output = UpstreamResult<UpstreamRow>> + Send;
}
