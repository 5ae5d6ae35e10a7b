//! Scripted mock backend for tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::SearchBackend;
use super::error::{UpstreamError, UpstreamResult};
use super::model::{SearchScope, UpstreamRow};
use crate::model::ProductRef;

/// One recorded backend call, for asserting on cascade order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ScopedSearch(String),
    GlobalSearch(String),
    InvokeMulti(String),
    ProductDetail(String),
}

#[derive(Default)]
struct MockState {
    search_responses: VecDeque<UpstreamResult<Vec<UpstreamRow>>>,
    invoke_responses: VecDeque<UpstreamResult<Vec<UpstreamRow>>>,
    detail_responses: VecDeque<UpstreamResult<UpstreamRow>>,
    calls: Vec<RecordedCall>,
}

/// Mock [`SearchBackend`] replaying scripted responses in FIFO order.
/// Unscripted calls return an empty, successful response.
#[derive(Clone, Default)]
pub struct MockSearchBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockSearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_search(&self, response: UpstreamResult<Vec<UpstreamRow>>) {
        self.state.lock().search_responses.push_back(response);
    }

    pub fn push_invoke(&self, response: UpstreamResult<Vec<UpstreamRow>>) {
        self.state.lock().invoke_responses.push_back(response);
    }

    pub fn push_detail(&self, response: UpstreamResult<UpstreamRow>) {
        self.state.lock().detail_responses.push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn search_call_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    RecordedCall::ScopedSearch(_) | RecordedCall::GlobalSearch(_)
                )
            })
            .count()
    }

    /// Builds a plain catalog row for scripting.
    pub fn row(merchant: &str, id: &str, title: &str, brand: Option<&str>) -> UpstreamRow {
        UpstreamRow {
            product_id: Some(id.to_string()),
            merchant_id: Some(merchant.to_string()),
            title: Some(title.to_string()),
            brand: brand.map(String::from),
            external_seed: false,
        }
    }

    /// Builds a shell row (present but semantically empty).
    pub fn shell_row() -> UpstreamRow {
        UpstreamRow {
            product_id: None,
            merchant_id: Some("m1".to_string()),
            title: None,
            brand: None,
            external_seed: false,
        }
    }
}

impl SearchBackend for MockSearchBackend {
    async fn search(
        &self,
        query: &str,
        scope: &SearchScope,
        _timeout: Duration,
    ) -> UpstreamResult<Vec<UpstreamRow>> {
        let mut state = self.state.lock();
        state.calls.push(if scope.is_global() {
            RecordedCall::GlobalSearch(query.to_string())
        } else {
            RecordedCall::ScopedSearch(query.to_string())
        });
        state.search_responses.pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn invoke_multi(
        &self,
        query: &str,
        _timeout: Duration,
    ) -> UpstreamResult<Vec<UpstreamRow>> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::InvokeMulti(query.to_string()));
        state.invoke_responses.pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn product_detail(
        &self,
        product_ref: &ProductRef,
        _timeout: Duration,
    ) -> UpstreamResult<UpstreamRow> {
        let mut state = self.state.lock();
        state
            .calls
            .push(RecordedCall::ProductDetail(product_ref.product_id.clone()));
        state.detail_responses.pop_front().unwrap_or(Err(
            UpstreamError::Http {
                status: 404,
                message: "no detail scripted".to_string(),
            },
        ))
    }
}
