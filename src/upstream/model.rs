//! Wire shapes returned by the live search APIs.
//!
//! Upstream rows are untrusted: any identifying field may be null. A "shell
//! row" is structurally present but semantically empty and disqualifies the
//! response it arrived in.

use serde::{Deserialize, Serialize};

use crate::model::{CandidateSource, ProductRef, ResolutionCandidate, SourceType};

/// Scope of a live search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Preferred/likely merchants only.
    Merchants(Vec<String>),
    /// All merchants.
    All,
}

impl SearchScope {
    pub fn is_global(&self) -> bool {
        matches!(self, SearchScope::All)
    }
}

/// One raw result row from an upstream search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamRow {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub external_seed: bool,
}

impl UpstreamRow {
    /// Null/empty identifying fields make the row a shell.
    pub fn is_shell(&self) -> bool {
        let empty = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").is_empty();
        empty(&self.product_id) || empty(&self.title)
    }

    /// Converts a non-shell row into a candidate attributed to `source`.
    pub fn into_candidate(self, source: CandidateSource) -> Option<ResolutionCandidate> {
        if self.is_shell() {
            return None;
        }
        let product_id = self.product_id?;
        let product_ref = match self.merchant_id {
            Some(merchant_id) if !merchant_id.trim().is_empty() => {
                ProductRef::new(merchant_id, product_id)
            }
            _ => ProductRef::bare(product_id),
        };
        Some(ResolutionCandidate {
            product_ref,
            title: self.title.unwrap_or_default(),
            brand: self.brand,
            source,
            source_type: if self.external_seed {
                SourceType::ExternalSeed
            } else {
                SourceType::Catalog
            },
            score: 0.0,
        })
    }
}

/// Envelope of the primary search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub products: Vec<UpstreamRow>,
}

/// Splits a raw response into usable candidates, rejecting it wholesale when
/// every row is a shell.
pub fn usable_rows(
    rows: Vec<UpstreamRow>,
    source: CandidateSource,
) -> Result<Vec<ResolutionCandidate>, super::UpstreamError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let candidates: Vec<ResolutionCandidate> = rows
        .into_iter()
        .filter_map(|r| r.into_candidate(source))
        .collect();
    if candidates.is_empty() {
        return Err(super::UpstreamError::ShellRows);
    }
    Ok(candidates)
}
