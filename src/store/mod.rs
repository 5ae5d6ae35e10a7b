//! Cache-first lexical store.
//!
//! Two read variants over one match pipeline: merchant-scoped and
//! cross-merchant. Both are purely local, consult no time budget, and read a
//! snapshot that an external refresh process swaps in. Cross-merchant lookups
//! for an identical normalized query are memoized briefly.

pub mod types;


use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use moka::sync::Cache;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::intent::{QueryIntent, title_is_cross_domain};
use crate::model::{
    CandidateSource, ProductRef, QUERY_SOURCE_CACHE_CROSS_MERCHANT, QUERY_SOURCE_CACHE_MERCHANT,
    ResolutionCandidate, ResolveOptions, SourceType,
};
use crate::normalize::tokenize;

pub use types::{CachedProduct, CatalogSnapshot, MerchantApproval, ProductStatus, RetrievalSource};

/// Default capacity of the cross-merchant memo cache.
pub const DEFAULT_MEMO_CAPACITY: u64 = 256;

/// Cross-merchant rows require merchant approval no older than this.
pub const APPROVAL_MAX_AGE_DAYS: i64 = 365;

/// Result of one store lookup.
#[derive(Debug, Clone)]
pub struct StoreLookup {
    pub products: Vec<ResolutionCandidate>,
    pub retrieval_sources: Vec<RetrievalSource>,
}

impl StoreLookup {
    pub fn has_candidates(&self) -> bool {
        !self.products.is_empty()
    }
}

/// Read path over the materialized product cache.
pub struct CatalogStore {
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    memo: Cache<[u8; 32], Arc<Vec<ResolutionCandidate>>>,
    approval_max_age: ChronoDuration,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("rows", &self.snapshot.read().products.len())
            .field("memo_entries", &self.memo.entry_count())
            .finish()
    }
}

impl CatalogStore {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self::with_memo_capacity(snapshot, DEFAULT_MEMO_CAPACITY)
    }

    pub fn with_memo_capacity(snapshot: CatalogSnapshot, memo_capacity: u64) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            memo: Cache::builder().max_capacity(memo_capacity).build(),
            approval_max_age: ChronoDuration::days(APPROVAL_MAX_AGE_DAYS),
        }
    }

    /// Swaps in a fresh snapshot. Called by the external refresh process; the
    /// memo is dropped wholesale since its rows may be stale.
    pub fn swap_snapshot(&self, snapshot: CatalogSnapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
        self.memo.invalidate_all();
    }

    fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.read().clone()
    }

    /// Rows in the current snapshot.
    pub fn product_count(&self) -> usize {
        self.snapshot().products.len()
    }

    /// Returns `true` if the catalog itself contains this exact pair, which is
    /// the only way an opaque hinted ID earns trust.
    pub fn verify_pair(&self, product_ref: &ProductRef) -> bool {
        let Some(merchant_id) = product_ref.merchant_id.as_deref() else {
            return false;
        };
        self.snapshot().products.iter().any(|p| {
            p.merchant_id == merchant_id
                && p.product_id == product_ref.product_id
                && p.status == ProductStatus::Published
        })
    }

    /// Merchant-scoped lexical search over the cache.
    #[instrument(skip(self, intent, opts), fields(query = query, merchants = merchants.len()))]
    pub fn search_merchant(
        &self,
        query: &str,
        merchants: &[String],
        intent: QueryIntent,
        opts: &ResolveOptions,
    ) -> StoreLookup {
        let products = self.run_match(query, Some(merchants), intent, opts);
        debug!(count = products.len(), "merchant-scoped cache lookup");
        StoreLookup {
            retrieval_sources: vec![RetrievalSource {
                source: "lexical_cache".to_string(),
                used: !products.is_empty(),
            }],
            products,
        }
    }

    /// Cross-merchant lexical search over the cache, memoized per normalized
    /// query shape.
    #[instrument(skip(self, intent, opts), fields(query = query))]
    pub fn search_cross_merchant(
        &self,
        query: &str,
        intent: QueryIntent,
        opts: &ResolveOptions,
    ) -> StoreLookup {
        let key = memo_key(query, opts);
        let products = match self.memo.get(&key) {
            Some(hit) => {
                debug!("cross-merchant memo hit");
                hit.as_ref().clone()
            }
            None => {
                let rows = self.run_match(query, None, intent, opts);
                self.memo.insert(key, Arc::new(rows.clone()));
                rows
            }
        };
        debug!(count = products.len(), "cross-merchant cache lookup");
        StoreLookup {
            retrieval_sources: vec![RetrievalSource {
                source: "lexical_cache".to_string(),
                used: !products.is_empty(),
            }],
            products,
        }
    }

    fn run_match(
        &self,
        query: &str,
        merchants: Option<&[String]>,
        intent: QueryIntent,
        opts: &ResolveOptions,
    ) -> Vec<ResolutionCandidate> {
        let snapshot = self.snapshot();
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let source = match merchants {
            Some(_) => CandidateSource::CacheMerchant,
            None => CandidateSource::CacheCrossMerchant,
        };

        let mut scored: Vec<(bool, f32, ResolutionCandidate)> = snapshot
            .products
            .iter()
            .filter(|p| p.status == ProductStatus::Published)
            .filter(|p| !opts.in_stock_only || p.in_stock)
            .filter(|p| opts.include_external_seeds || p.source_type != SourceType::ExternalSeed)
            .filter(|p| match merchants {
                Some(m) => m.iter().any(|id| id == &p.merchant_id),
                // Cross-merchant rows additionally pass the approval policy.
                None => self.merchant_sellable(&snapshot, &p.merchant_id),
            })
            .filter_map(|p| {
                let score = lexical_overlap(&query_tokens, p);
                (score > 0.0).then(|| {
                    let cross_domain = title_is_cross_domain(&p.title, intent.target);
                    (
                        cross_domain,
                        score,
                        ResolutionCandidate {
                            product_ref: ProductRef::new(&p.merchant_id, &p.product_id),
                            title: p.title.clone(),
                            brand: p.brand.clone(),
                            source,
                            source_type: p.source_type,
                            score,
                        },
                    )
                })
            })
            .collect();

        // Same-domain rows rank above cross-domain ones regardless of raw
        // lexical score; raw score breaks ties.
        scored.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
        });

        scored.into_iter().map(|(_, _, c)| c).collect()
    }

    fn merchant_sellable(&self, snapshot: &CatalogSnapshot, merchant_id: &str) -> bool {
        match snapshot.approvals.get(merchant_id) {
            Some(approval) if approval.approved => match approval.approved_at {
                Some(at) => Utc::now().signed_duration_since(at) <= self.approval_max_age,
                None => false,
            },
            _ => false,
        }
    }

    /// `query_source` string for the matching variant.
    pub fn query_source(merchant_scoped: bool) -> &'static str {
        if merchant_scoped {
            QUERY_SOURCE_CACHE_MERCHANT
        } else {
            QUERY_SOURCE_CACHE_CROSS_MERCHANT
        }
    }
}

/// Token overlap between the query and a row's brand + title, in [0, 1].
fn lexical_overlap(query_tokens: &[String], product: &CachedProduct) -> f32 {
    let mut row_tokens = tokenize(&product.title);
    if let Some(brand) = &product.brand {
        row_tokens.extend(tokenize(brand));
    }
    let matched = query_tokens
        .iter()
        .filter(|t| row_tokens.contains(t))
        .count();
    matched as f32 / query_tokens.len() as f32
}

fn memo_key(query: &str, opts: &ResolveOptions) -> [u8; 32] {
    let shape = format!(
        "{}|stock:{}|seeds:{}",
        query, opts.in_stock_only, opts.include_external_seeds
    );
    *blake3::hash(shape.as_bytes()).as_bytes()
}
