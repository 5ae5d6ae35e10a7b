//! Core domain and wire types for the resolution engine.
//!
//! Everything here is created per-request and dropped once the response is
//! serialized. The serde representations are the external contract: reason
//! codes and source names serialize as `snake_case` strings.


use serde::{Deserialize, Serialize};

/// Response header carrying the final `query_source` of a request.
pub const PINPOINT_SOURCE_HEADER: &str = "X-Pinpoint-Source";

pub const QUERY_SOURCE_STABLE_ALIAS: &str = "stable_alias_ref";
pub const QUERY_SOURCE_HINTS: &str = "hints_product_ref";
pub const QUERY_SOURCE_CACHE_MERCHANT: &str = "cache_merchant_search";
pub const QUERY_SOURCE_CACHE_CROSS_MERCHANT: &str = "cache_cross_merchant_search";
pub const QUERY_SOURCE_SCOPED_SEARCH: &str = "catalog_search_scoped";
pub const QUERY_SOURCE_GLOBAL_SEARCH: &str = "catalog_search_global";
pub const QUERY_SOURCE_SECONDARY_SEARCH: &str = "multi_merchant_invoke";
pub const QUERY_SOURCE_RESOLVER_FALLBACK: &str = "agent_products_resolver_fallback";
pub const QUERY_SOURCE_ERROR_FALLBACK: &str = "agent_products_error_fallback";

pub const FALLBACK_REASON_NOT_NEEDED: &str = "not_needed";
pub const FALLBACK_REASON_RESOLVER_AFTER_PRIMARY: &str = "resolver_after_primary";
pub const FALLBACK_REASON_PRIMARY_IRRELEVANT: &str = "primary_irrelevant_no_fallback";

/// Canonical reference to one product at one merchant.
///
/// A present `merchant_id` means the pair is confirmed; a bare `product_id`
/// is acceptable for merchant-agnostic catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,
    pub product_id: String,
}

impl ProductRef {
    pub fn new(merchant_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            merchant_id: Some(merchant_id.into()),
            product_id: product_id.into(),
        }
    }

    pub fn bare(product_id: impl Into<String>) -> Self {
        Self {
            merchant_id: None,
            product_id: product_id.into(),
        }
    }

    /// A confirmed reference carries both halves of the pair.
    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.merchant_id.is_some()
    }
}

/// Which cascade stage discovered a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    HintsProductRef,
    StableAlias,
    CacheMerchant,
    CacheCrossMerchant,
    ScopedSearch,
    GlobalSearch,
    SecondarySearch,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::HintsProductRef => QUERY_SOURCE_HINTS,
            CandidateSource::StableAlias => QUERY_SOURCE_STABLE_ALIAS,
            CandidateSource::CacheMerchant => QUERY_SOURCE_CACHE_MERCHANT,
            CandidateSource::CacheCrossMerchant => QUERY_SOURCE_CACHE_CROSS_MERCHANT,
            CandidateSource::ScopedSearch => QUERY_SOURCE_SCOPED_SEARCH,
            CandidateSource::GlobalSearch => QUERY_SOURCE_GLOBAL_SEARCH,
            CandidateSource::SecondarySearch => QUERY_SOURCE_SECONDARY_SEARCH,
        }
    }

    /// Direct hits (alias, cache, primary search) carry more certainty than
    /// rows retrieved only after a fallback stage.
    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, CandidateSource::SecondarySearch)
    }
}

/// Provenance class of a candidate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Verified catalog data.
    Catalog,
    /// Unverified placeholder row seeded from outside the catalog. Excluded
    /// from consideration unless the caller explicitly opts in.
    ExternalSeed,
}

/// One product candidate surviving a cascade stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionCandidate {
    pub product_ref: ProductRef,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub source: CandidateSource,
    pub source_type: SourceType,
    /// Relevance score assigned by the scorer; 0.0 until scored.
    #[serde(default)]
    pub score: f32,
}

/// Audit record for one attempted cascade stage.
///
/// Outcomes are appended in attempt order and never mutated afterwards; the
/// full list is returned as `metadata.sources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source: String,
    pub ok: bool,
    pub attempts: u32,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub latency_ms: u64,
}

impl SourceOutcome {
    pub fn ok(source: impl Into<String>, count: usize, latency_ms: u64) -> Self {
        Self {
            source: source.into(),
            ok: true,
            attempts: 1,
            count,
            reason: None,
            latency_ms,
        }
    }

    pub fn failed(source: impl Into<String>, reason: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            source: source.into(),
            ok: false,
            attempts: 1,
            count: 0,
            reason: Some(reason.into()),
            latency_ms,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Terminal reason for a resolution decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    HintsProductRef,
    StableAliasRef,
    CacheMerchantSearch,
    CacheCrossMerchantSearch,
    CatalogSearchScoped,
    CatalogSearchGlobal,
    MultiMerchantInvoke,
    Ambiguous,
    NoCandidates,
    DbTimeout,
    OpaqueHintRequiresLookup,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::HintsProductRef => "hints_product_ref",
            ReasonCode::StableAliasRef => "stable_alias_ref",
            ReasonCode::CacheMerchantSearch => "cache_merchant_search",
            ReasonCode::CacheCrossMerchantSearch => "cache_cross_merchant_search",
            ReasonCode::CatalogSearchScoped => "catalog_search_scoped",
            ReasonCode::CatalogSearchGlobal => "catalog_search_global",
            ReasonCode::MultiMerchantInvoke => "multi_merchant_invoke",
            ReasonCode::Ambiguous => "ambiguous",
            ReasonCode::NoCandidates => "no_candidates",
            ReasonCode::DbTimeout => "db_timeout",
            ReasonCode::OpaqueHintRequiresLookup => "opaque_hint_requires_lookup",
        }
    }

    #[inline]
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            ReasonCode::NoCandidates | ReasonCode::DbTimeout | ReasonCode::Ambiguous
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clarification prompt returned instead of a guess when ambiguity lands in
/// the mid band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clarification {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySearchFallback {
    pub applied: bool,
    pub reason: String,
}

impl ProxySearchFallback {
    pub fn not_needed() -> Self {
        Self {
            applied: false,
            reason: FALLBACK_REASON_NOT_NEEDED.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteHealth {
    pub clarify_triggered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTrace {
    pub final_decision: String,
}

/// Provenance metadata attached to every response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionMetadata {
    pub sources: Vec<SourceOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_source: Option<String>,
    #[serde(default)]
    pub query_from_hints: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_alias_match_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_search_fallback: Option<ProxySearchFallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_health: Option<RouteHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_trace: Option<SearchTrace>,
}

impl ResolutionMetadata {
    /// Appends a stage outcome to the audit trail.
    pub fn record(&mut self, outcome: SourceOutcome) {
        self.sources.push(outcome);
    }

    /// Returns `true` if a stage with the given source name was attempted.
    pub fn attempted(&self, source: &str) -> bool {
        self.sources.iter().any(|o| o.source == source)
    }
}

/// Final decision of the resolution cascade.
///
/// Invariants: `resolved == true` implies `product_ref` is present and
/// `confidence > 0`; `resolved == false` implies `reason_code` names a
/// terminal reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_ref: Option<ProductRef>,
    pub confidence: f32,
    pub reason: ReasonCode,
    pub reason_code: ReasonCode,
    pub candidates: Vec<ResolutionCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<Clarification>,
    pub metadata: ResolutionMetadata,
}

impl ResolutionResult {
    pub fn resolved(
        product_ref: ProductRef,
        confidence: f32,
        reason_code: ReasonCode,
        candidates: Vec<ResolutionCandidate>,
        metadata: ResolutionMetadata,
    ) -> Self {
        Self {
            resolved: true,
            product_ref: Some(product_ref),
            confidence,
            reason: reason_code,
            reason_code,
            candidates,
            clarification: None,
            metadata,
        }
    }

    pub fn empty(reason_code: ReasonCode, metadata: ResolutionMetadata) -> Self {
        Self {
            resolved: false,
            product_ref: None,
            confidence: 0.0,
            reason: reason_code,
            reason_code,
            candidates: Vec::new(),
            clarification: None,
            metadata,
        }
    }

    pub fn clarify(clarification: Clarification, mut metadata: ResolutionMetadata) -> Self {
        metadata.route_health = Some(RouteHealth {
            clarify_triggered: true,
        });
        metadata.search_trace = Some(SearchTrace {
            final_decision: "clarify".to_string(),
        });
        Self {
            resolved: false,
            product_ref: None,
            confidence: 0.0,
            reason: ReasonCode::Ambiguous,
            reason_code: ReasonCode::Ambiguous,
            candidates: Vec::new(),
            clarification: Some(clarification),
            metadata,
        }
    }

    #[inline]
    pub fn is_clarify(&self) -> bool {
        self.clarification.is_some()
    }
}

/// Caller-supplied hints accompanying a resolve request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HintBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_ref: Option<ProductRef>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl HintBundle {
    /// Best human-readable text carried by the bundle, used as the effective
    /// query when the raw query itself is opaque.
    pub fn best_text(&self) -> Option<&str> {
        self.aliases
            .iter()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
            .or(self.title.as_deref().filter(|s| !s.trim().is_empty()))
    }
}

/// Per-request options controlling scope, budget and retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOptions {
    #[serde(default)]
    pub prefer_merchants: Vec<String>,
    #[serde(default)]
    pub search_all_merchants: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_retries: Option<u32>,
    #[serde(default)]
    pub include_external_seeds: bool,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            prefer_merchants: Vec::new(),
            search_all_merchants: false,
            timeout_ms: None,
            upstream_retries: None,
            include_external_seeds: false,
            in_stock_only: false,
        }
    }
}
