use std::time::Duration;

use serde_json::json;
use tracing::debug;

use super::SearchBackend;
use super::error::{UpstreamError, UpstreamResult};
use super::model::{SearchResponse, SearchScope, UpstreamRow};
use crate::model::ProductRef;

/// HTTP client for the live catalog search API and the secondary
/// multi-merchant invoke API. Both are treated as untrusted, retryable,
/// fallible dependencies; retry policy lives in the caller, not here.
#[derive(Debug, Clone)]
pub struct CatalogSearchClient {
    http: reqwest::Client,
    search_url: String,
    invoke_url: String,
}

impl CatalogSearchClient {
    pub fn new(search_url: impl Into<String>, invoke_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            search_url: search_url.into(),
            invoke_url: invoke_url.into(),
        }
    }

    fn map_send_error(e: reqwest::Error, timeout: Duration) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout {
                elapsed_ms: timeout.as_millis() as u64,
            }
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }

    async fn decode_rows(response: reqwest::Response) -> UpstreamResult<Vec<UpstreamRow>> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                message,
            });
        }
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidPayload(e.to_string()))?;
        Ok(body.products)
    }
}

impl SearchBackend for CatalogSearchClient {
    async fn search(
        &self,
        query: &str,
        scope: &SearchScope,
        timeout: Duration,
    ) -> UpstreamResult<Vec<UpstreamRow>> {
        let mut request = self
            .http
            .get(&self.search_url)
            .query(&[("q", query)])
            .timeout(timeout);
        if let SearchScope::Merchants(merchants) = scope {
            request = request.query(&[("merchants", merchants.join(","))]);
        }
        debug!(query, global = scope.is_global(), "live catalog search");

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;
        Self::decode_rows(response).await
    }

    async fn invoke_multi(
        &self,
        query: &str,
        timeout: Duration,
    ) -> UpstreamResult<Vec<UpstreamRow>> {
        debug!(query, "secondary multi-merchant invoke");
        let response = self
            .http
            .post(&self.invoke_url)
            .json(&json!({
                "operation": "find_products_multi",
                "query": query,
            }))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;
        Self::decode_rows(response).await
    }

    async fn product_detail(
        &self,
        product_ref: &ProductRef,
        timeout: Duration,
    ) -> UpstreamResult<UpstreamRow> {
        let mut request = self
            .http
            .get(format!("{}/{}", self.search_url, product_ref.product_id))
            .timeout(timeout);
        if let Some(merchant_id) = &product_ref.merchant_id {
            request = request.query(&[("merchant_id", merchant_id)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidPayload(e.to_string()))
    }
}
