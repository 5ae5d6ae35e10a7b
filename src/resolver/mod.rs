//! Grounded resolution and search fallback engine.
//!
//! The cascade tries, in strict priority order and under one shared time
//! budget: trusted hints, the stable alias table, the cache-first lexical
//! store, live search scoped to preferred merchants, live global search, and
//! finally the secondary multi-merchant path. Whatever a stage returns is
//! scored and filtered before it may short-circuit the cascade, and the
//! ambiguity gate decides between resolved, clarify and empty. Every stage
//! appends a [`SourceOutcome`] to the trace in attempt order.
//!
//! Dependency failures are absorbed here; the caller only ever sees a
//! well-formed result or an input-validation error.

pub mod error;


use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::alias::AliasTableHandle;
use crate::ambiguity::{AmbiguityThresholds, GateDecision, decide, dedupe_by_title};
use crate::budget::{DEFAULT_REQUEST_BUDGET, TimeBudget, with_retry};
use crate::intent::{QueryIntent, classify};
use crate::model::{
    CandidateSource, Clarification, HintBundle, QUERY_SOURCE_HINTS, ReasonCode,
    ResolutionCandidate, ResolutionMetadata, ResolutionResult, ResolveOptions, SourceOutcome,
    SourceType,
};
use crate::normalize::{HintRefDisposition, NormalizedRequest, reconcile};
use crate::scoring::RelevanceScorer;
use crate::store::CatalogStore;
use crate::upstream::{SearchBackend, SearchScope, usable_rows};

pub use error::{ResolveError, ResolveResult};

/// Confidence assigned to a trusted caller-supplied reference. Below an alias
/// hit, above anything retrieved by search.
const HINT_REF_CONFIDENCE: f32 = 0.95;

/// Timeout for the product-detail hydration call, outside the main budget.
const DETAIL_TIMEOUT: Duration = Duration::from_millis(800);

/// Engine configuration, assembled from [`crate::config::Config`] at startup.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub thresholds: AmbiguityThresholds,
    pub default_timeout: Duration,
    pub default_retries: u32,
    /// Run the resolver cascade before the live proxy on the search route.
    pub resolver_first_search: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            thresholds: AmbiguityThresholds::default(),
            default_timeout: DEFAULT_REQUEST_BUDGET,
            default_retries: 1,
            resolver_first_search: false,
        }
    }
}

/// Product list response for the search-shaped routes.
#[derive(Debug, Clone)]
pub struct ProductSearch {
    pub products: Vec<ResolutionCandidate>,
    pub clarification: Option<Clarification>,
    pub metadata: ResolutionMetadata,
}

/// The resolution engine. Reentrant: all shared state is read-only, each
/// request owns its budget and trace.
pub struct Resolver<B: SearchBackend> {
    alias: AliasTableHandle,
    store: Arc<CatalogStore>,
    backend: B,
    scorer: RelevanceScorer,
    config: ResolverConfig,
}

impl<B: SearchBackend> std::fmt::Debug for Resolver<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("alias_entries", &self.alias.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B: SearchBackend> Resolver<B> {
    pub fn new(
        alias: AliasTableHandle,
        store: Arc<CatalogStore>,
        backend: B,
        scorer: RelevanceScorer,
        config: ResolverConfig,
    ) -> Self {
        Self {
            alias,
            store,
            backend,
            scorer,
            config,
        }
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    /// Curated alias entry count, surfaced by the readiness probe.
    pub fn alias_len(&self) -> usize {
        self.alias.len()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves a free-text or hinted product reference to a canonical
    /// `(merchant_id, product_id)` pair, a clarification, or an explicit
    /// empty — never a guess presented as certainty.
    #[instrument(skip(self, hints, opts), fields(query_len = query.len()))]
    pub async fn resolve(
        &self,
        query: &str,
        hints: Option<&HintBundle>,
        opts: &ResolveOptions,
    ) -> ResolveResult<ResolutionResult> {
        let normalized = reconcile(query, hints);
        let mut metadata = ResolutionMetadata {
            query_from_hints: normalized.query_from_hints,
            effective_query: normalized
                .query_from_hints
                .then(|| normalized.effective_query.clone()),
            ..Default::default()
        };

        // Trusted hint references resolve with zero network.
        if let Some(result) = self.try_hint_ref(&normalized, &mut metadata) {
            return Ok(result);
        }

        if normalized.effective_query.is_empty() {
            return Err(ResolveError::MissingParameters("query"));
        }

        let intent = classify(&normalized.effective_query);
        let budget = self.budget_for(opts);

        // Alias stage is free and certain; short-circuits everything else.
        if let Some(result) = self.try_alias(&normalized.effective_query, &mut metadata) {
            return Ok(result);
        }

        let decision = self
            .run_cascade(&normalized, intent, &budget, opts, &mut metadata)
            .await;
        Ok(self.finish(decision, intent, metadata))
    }

    /// Cache stage then network stages; returns the first stage outcome whose
    /// scored candidates survive relevance, or the terminal empty reason.
    async fn run_cascade(
        &self,
        normalized: &NormalizedRequest,
        intent: QueryIntent,
        budget: &TimeBudget,
        opts: &ResolveOptions,
        metadata: &mut ResolutionMetadata,
    ) -> CascadeOutcome {
        let query = &normalized.effective_query;
        let hint_brand = normalized.hint_brand.as_deref();
        let mut saw_upstream_error = false;

        // Cache-first: merchant-scoped, then cross-merchant. Local, free.
        if !opts.prefer_merchants.is_empty() {
            let lookup =
                self.store
                    .search_merchant(query, &opts.prefer_merchants, intent, opts);
            let scored = self.scorer.score(query, hint_brand, lookup.products, opts);
            metadata.record(SourceOutcome::ok(
                CandidateSource::CacheMerchant.as_str(),
                scored.len(),
                0,
            ));
            if !scored.is_empty() {
                info!(count = scored.len(), "cache hit (merchant-scoped), skipping network");
                return CascadeOutcome::Found(CandidateSource::CacheMerchant, scored);
            }
        }

        let lookup = self.store.search_cross_merchant(query, intent, opts);
        let scored = self.scorer.score(query, hint_brand, lookup.products, opts);
        metadata.record(SourceOutcome::ok(
            CandidateSource::CacheCrossMerchant.as_str(),
            scored.len(),
            0,
        ));
        if !scored.is_empty() {
            info!(count = scored.len(), "cache hit (cross-merchant), skipping network");
            return CascadeOutcome::Found(CandidateSource::CacheCrossMerchant, scored);
        }

        // Live search: scoped to preferred merchants, then global. The budget
        // is shared — a slow scoped stage leaves less for the global one.
        if !opts.prefer_merchants.is_empty() {
            let scope = SearchScope::Merchants(opts.prefer_merchants.clone());
            match self
                .network_stage(normalized, CandidateSource::ScopedSearch, &scope, budget, opts, metadata)
                .await
            {
                StageResult::Relevant(scored) => {
                    return CascadeOutcome::Found(CandidateSource::ScopedSearch, scored);
                }
                StageResult::Failed => saw_upstream_error = true,
                StageResult::Irrelevant | StageResult::Skipped => {}
            }
        }

        match self
            .network_stage(normalized, CandidateSource::GlobalSearch, &SearchScope::All, budget, opts, metadata)
            .await
        {
            StageResult::Relevant(scored) => {
                return CascadeOutcome::Found(CandidateSource::GlobalSearch, scored);
            }
            StageResult::Failed => saw_upstream_error = true,
            StageResult::Irrelevant | StageResult::Skipped => {}
        }

        // Secondary path: only once the primary cascade is exhausted. Its
        // rows are held to the same relevance bar — an irrelevant secondary
        // response is not trusted either.
        match self
            .secondary_stage(normalized, budget, opts, metadata)
            .await
        {
            StageResult::Relevant(scored) => {
                return CascadeOutcome::Found(CandidateSource::SecondarySearch, scored);
            }
            StageResult::Failed => saw_upstream_error = true,
            StageResult::Irrelevant | StageResult::Skipped => {}
        }

        if saw_upstream_error && budget.is_exhausted() {
            CascadeOutcome::Empty(ReasonCode::DbTimeout)
        } else {
            CascadeOutcome::Empty(ReasonCode::NoCandidates)
        }
    }

    /// One live-search stage with bounded retry against the shared budget.
    async fn network_stage(
        &self,
        normalized: &NormalizedRequest,
        source: CandidateSource,
        scope: &SearchScope,
        budget: &TimeBudget,
        opts: &ResolveOptions,
        metadata: &mut ResolutionMetadata,
    ) -> StageResult {
        if budget.is_exhausted() {
            debug!(source = source.as_str(), "budget exhausted, stage skipped");
            return StageResult::Skipped;
        }

        let query = &normalized.effective_query;
        let max_attempts = self.retries_for(opts) + 1;
        let outcome = with_retry(budget, max_attempts, |timeout| {
            self.backend.search(query, scope, timeout)
        })
        .await;

        let latency_ms = outcome.elapsed.as_millis() as u64;
        match outcome.result.and_then(|rows| usable_rows(rows, source)) {
            Ok(candidates) => {
                let scored =
                    self.scorer
                        .score(query, normalized.hint_brand.as_deref(), candidates, opts);
                metadata.record(
                    SourceOutcome::ok(source.as_str(), scored.len(), latency_ms)
                        .with_attempts(outcome.attempts),
                );
                if scored.is_empty() {
                    debug!(source = source.as_str(), "stage rows failed relevance");
                    StageResult::Irrelevant
                } else {
                    StageResult::Relevant(scored)
                }
            }
            Err(e) => {
                warn!(source = source.as_str(), error = %e, "live search stage failed");
                metadata.record(
                    SourceOutcome::failed(source.as_str(), e.to_string(), latency_ms)
                        .with_attempts(outcome.attempts),
                );
                StageResult::Failed
            }
        }
    }

    async fn secondary_stage(
        &self,
        normalized: &NormalizedRequest,
        budget: &TimeBudget,
        opts: &ResolveOptions,
        metadata: &mut ResolutionMetadata,
    ) -> StageResult {
        if budget.is_exhausted() {
            return StageResult::Skipped;
        }

        let query = &normalized.effective_query;
        let source = CandidateSource::SecondarySearch;
        let outcome = with_retry(budget, self.retries_for(opts) + 1, |timeout| {
            self.backend.invoke_multi(query, timeout)
        })
        .await;

        let latency_ms = outcome.elapsed.as_millis() as u64;
        match outcome.result.and_then(|rows| usable_rows(rows, source)) {
            Ok(candidates) => {
                let scored =
                    self.scorer
                        .score(query, normalized.hint_brand.as_deref(), candidates, opts);
                metadata.record(
                    SourceOutcome::ok(source.as_str(), scored.len(), latency_ms)
                        .with_attempts(outcome.attempts),
                );
                if scored.is_empty() {
                    StageResult::Irrelevant
                } else {
                    StageResult::Relevant(scored)
                }
            }
            Err(e) => {
                warn!(error = %e, "secondary search path failed");
                metadata.record(
                    SourceOutcome::failed(source.as_str(), e.to_string(), latency_ms)
                        .with_attempts(outcome.attempts),
                );
                StageResult::Failed
            }
        }
    }

    /// Applies the ambiguity gate and dedupe policy to a cascade outcome.
    fn finish(
        &self,
        outcome: CascadeOutcome,
        intent: QueryIntent,
        mut metadata: ResolutionMetadata,
    ) -> ResolutionResult {
        match outcome {
            CascadeOutcome::Found(source, scored) => {
                metadata.query_source = Some(source.as_str().to_string());
                match decide(&scored, intent, &self.config.thresholds) {
                    GateDecision::Resolved {
                        candidate,
                        confidence,
                    } => {
                        let candidates = dedupe_by_title(scored, intent.class);
                        ResolutionResult::resolved(
                            candidate.product_ref.clone(),
                            confidence,
                            reason_for(source),
                            candidates,
                            metadata,
                        )
                    }
                    GateDecision::Clarify(clarification) => {
                        info!("mid-band ambiguity, asking for clarification");
                        ResolutionResult::clarify(clarification, metadata)
                    }
                    GateDecision::Empty => {
                        ResolutionResult::empty(ReasonCode::Ambiguous, metadata)
                    }
                }
            }
            CascadeOutcome::Empty(reason) => {
                info!(reason = reason.as_str(), "cascade exhausted");
                ResolutionResult::empty(reason, metadata)
            }
        }
    }

    /// Trusted-hint short-circuit plus the opaque-ID safety policy.
    fn try_hint_ref(
        &self,
        normalized: &NormalizedRequest,
        metadata: &mut ResolutionMetadata,
    ) -> Option<ResolutionResult> {
        let disposition = normalized.hint_ref.as_ref()?;
        let started = Instant::now();

        let trusted = match disposition {
            HintRefDisposition::Trusted(r) => Some(r),
            // An opaque ID is only usable when the catalog itself confirms
            // the merchant pairing the caller asserted.
            HintRefDisposition::NeedsVerification(r) => self.store.verify_pair(r).then_some(r),
            HintRefDisposition::NeedsLookup(_) => None,
        };

        match trusted {
            Some(product_ref) => {
                let mut meta = std::mem::take(metadata);
                meta.record(SourceOutcome::ok(
                    QUERY_SOURCE_HINTS,
                    1,
                    started.elapsed().as_millis() as u64,
                ));
                meta.query_source = Some(QUERY_SOURCE_HINTS.to_string());
                info!(product_id = %product_ref.product_id, "resolved from trusted hint reference");
                Some(ResolutionResult::resolved(
                    product_ref.clone(),
                    HINT_REF_CONFIDENCE,
                    ReasonCode::HintsProductRef,
                    Vec::new(),
                    meta,
                ))
            }
            None => {
                debug!("hint reference failed opaque-ID policy, proceeding to lookup");
                metadata.record(SourceOutcome::failed(
                    QUERY_SOURCE_HINTS,
                    ReasonCode::OpaqueHintRequiresLookup.as_str(),
                    started.elapsed().as_millis() as u64,
                ));
                None
            }
        }
    }

    fn try_alias(
        &self,
        effective_query: &str,
        metadata: &mut ResolutionMetadata,
    ) -> Option<ResolutionResult> {
        let entry = self.alias.lookup(effective_query)?;
        let mut meta = std::mem::take(metadata);
        meta.record(SourceOutcome::ok(CandidateSource::StableAlias.as_str(), 1, 0));
        meta.query_source = Some(CandidateSource::StableAlias.as_str().to_string());
        meta.stable_alias_match_id = Some(entry.match_id.clone());
        info!(match_id = %entry.match_id, "stable alias hit");

        let candidate = ResolutionCandidate {
            product_ref: entry.product_ref.clone(),
            title: entry.title.clone(),
            brand: Some(entry.brand.clone()),
            source: CandidateSource::StableAlias,
            source_type: SourceType::Catalog,
            score: 1.0,
        };
        Some(ResolutionResult::resolved(
            entry.product_ref.clone(),
            1.0,
            ReasonCode::StableAliasRef,
            vec![candidate],
            meta,
        ))
    }

    fn budget_for(&self, opts: &ResolveOptions) -> TimeBudget {
        match opts.timeout_ms {
            Some(ms) => TimeBudget::from_millis(ms),
            None => TimeBudget::new(self.config.default_timeout),
        }
    }

    fn retries_for(&self, opts: &ResolveOptions) -> u32 {
        opts.upstream_retries.unwrap_or(self.config.default_retries)
    }

    /// Enriches a bare reference into a full product row via the detail
    /// call. Soft-fails: the bare reference passes through on error.
    pub async fn hydrate(&self, candidate: ResolutionCandidate) -> ResolutionCandidate {
        if !candidate.title.is_empty() {
            return candidate;
        }
        match self
            .backend
            .product_detail(&candidate.product_ref, DETAIL_TIMEOUT)
            .await
        {
            Ok(row) => {
                let mut hydrated = candidate;
                if let Some(title) = row.title {
                    hydrated.title = title;
                }
                if row.brand.is_some() {
                    hydrated.brand = row.brand;
                }
                hydrated
            }
            Err(e) => {
                debug!(error = %e, "product detail hydration failed, keeping bare ref");
                candidate
            }
        }
    }
}

/// Search-route orchestration: proxy-first live search with resolver
/// fallback, per the route's `proxy_search_fallback` contract.
impl<B: SearchBackend> Resolver<B> {
    #[instrument(skip(self, opts), fields(query_len = query.len()))]
    pub async fn search_products(
        &self,
        query: &str,
        opts: &ResolveOptions,
        limit: usize,
        offset: usize,
    ) -> ResolveResult<ProductSearch> {
        let normalized = reconcile(query, None);
        if normalized.effective_query.is_empty() {
            return Err(ResolveError::MissingParameters("query"));
        }
        let intent = classify(&normalized.effective_query);
        let budget = self.budget_for(opts);
        let mut metadata = ResolutionMetadata::default();

        if !self.config.resolver_first_search {
            let stage = self
                .network_stage(&normalized, CandidateSource::GlobalSearch, &SearchScope::All, &budget, opts, &mut metadata)
                .await;
            if let StageResult::Relevant(scored) = stage {
                let products = page(dedupe_by_title(scored, intent.class), limit, offset);
                metadata.query_source =
                    Some(CandidateSource::GlobalSearch.as_str().to_string());
                metadata.proxy_search_fallback = Some(crate::model::ProxySearchFallback::not_needed());
                return Ok(ProductSearch {
                    products,
                    clarification: None,
                    metadata,
                });
            }
        }

        // Primary proxy failed or was irrelevant: fall back to the full
        // resolver cascade (alias, cache, remaining search stages).
        let fallback_opts = ResolveOptions {
            timeout_ms: Some(budget.remaining().as_millis() as u64),
            ..opts.clone()
        };
        let result = self
            .resolve(&normalized.effective_query, None, &fallback_opts)
            .await?;

        let mut metadata = merge_traces(metadata, result.metadata.clone());
        if result.resolved || !result.candidates.is_empty() {
            metadata.query_source =
                Some(crate::model::QUERY_SOURCE_RESOLVER_FALLBACK.to_string());
            metadata.proxy_search_fallback = Some(crate::model::ProxySearchFallback {
                applied: true,
                reason: crate::model::FALLBACK_REASON_RESOLVER_AFTER_PRIMARY.to_string(),
            });
            let mut products = Vec::with_capacity(result.candidates.len());
            for candidate in page(result.candidates, limit, offset) {
                products.push(self.hydrate(candidate).await);
            }
            return Ok(ProductSearch {
                products,
                clarification: None,
                metadata,
            });
        }

        if result.is_clarify() {
            metadata.query_source =
                Some(crate::model::QUERY_SOURCE_RESOLVER_FALLBACK.to_string());
            metadata.proxy_search_fallback = Some(crate::model::ProxySearchFallback {
                applied: true,
                reason: crate::model::FALLBACK_REASON_RESOLVER_AFTER_PRIMARY.to_string(),
            });
            metadata.route_health = result.metadata.route_health.clone();
            metadata.search_trace = result.metadata.search_trace.clone();
            return Ok(ProductSearch {
                products: Vec::new(),
                clarification: result.clarification,
                metadata,
            });
        }

        // Nothing anywhere: explicit empty, never a confident-but-wrong list.
        metadata.query_source = Some(crate::model::QUERY_SOURCE_ERROR_FALLBACK.to_string());
        metadata.proxy_search_fallback = Some(crate::model::ProxySearchFallback {
            applied: false,
            reason: crate::model::FALLBACK_REASON_PRIMARY_IRRELEVANT.to_string(),
        });
        Ok(ProductSearch {
            products: Vec::new(),
            clarification: None,
            metadata,
        })
    }

    /// Cache-first multi-merchant lookup for the invoke route: on a cache
    /// hit, upstream search is skipped entirely.
    #[instrument(skip(self, opts), fields(query_len = query.len()))]
    pub async fn find_products_multi(
        &self,
        query: &str,
        opts: &ResolveOptions,
    ) -> ResolveResult<ProductSearch> {
        let normalized = reconcile(query, None);
        if normalized.effective_query.is_empty() {
            return Err(ResolveError::MissingParameters("query"));
        }
        let intent = classify(&normalized.effective_query);
        let mut metadata = ResolutionMetadata::default();

        let lookup = self
            .store
            .search_cross_merchant(&normalized.effective_query, intent, opts);
        let scored =
            self.scorer
                .score(&normalized.effective_query, None, lookup.products, opts);
        metadata.record(SourceOutcome::ok(
            CandidateSource::CacheCrossMerchant.as_str(),
            scored.len(),
            0,
        ));

        if !scored.is_empty() {
            metadata.query_source =
                Some(CandidateSource::CacheCrossMerchant.as_str().to_string());
            return Ok(match decide(&scored, intent, &self.config.thresholds) {
                GateDecision::Clarify(clarification) => {
                    let mut meta = metadata;
                    meta.route_health = Some(crate::model::RouteHealth {
                        clarify_triggered: true,
                    });
                    meta.search_trace = Some(crate::model::SearchTrace {
                        final_decision: "clarify".to_string(),
                    });
                    ProductSearch {
                        products: Vec::new(),
                        clarification: Some(clarification),
                        metadata: meta,
                    }
                }
                GateDecision::Empty => {
                    // High-ambiguity sets return nothing rather than a
                    // confident-looking list the gate would not stand behind.
                    info!("cache candidates too ambiguous, returning strict empty");
                    let mut meta = metadata;
                    meta.search_trace = Some(crate::model::SearchTrace {
                        final_decision: "strict_empty".to_string(),
                    });
                    ProductSearch {
                        products: Vec::new(),
                        clarification: None,
                        metadata: meta,
                    }
                }
                GateDecision::Resolved { .. } => ProductSearch {
                    products: dedupe_by_title(scored, intent.class),
                    clarification: None,
                    metadata,
                },
            });
        }

        // Cache miss: run the full cascade.
        let result = self
            .resolve(&normalized.effective_query, None, opts)
            .await?;
        let metadata = merge_traces(metadata, result.metadata.clone());
        if result.is_clarify() {
            return Ok(ProductSearch {
                products: Vec::new(),
                clarification: result.clarification,
                metadata,
            });
        }
        let mut products = Vec::with_capacity(result.candidates.len());
        for candidate in result.candidates {
            products.push(self.hydrate(candidate).await);
        }
        Ok(ProductSearch {
            products,
            clarification: None,
            metadata,
        })
    }
}

fn page(
    candidates: Vec<ResolutionCandidate>,
    limit: usize,
    offset: usize,
) -> Vec<ResolutionCandidate> {
    candidates.into_iter().skip(offset).take(limit).collect()
}

/// Joins the outer route trace with an inner cascade trace, keeping the
/// inner run's query attribution fields.
fn merge_traces(
    outer: ResolutionMetadata,
    inner: ResolutionMetadata,
) -> ResolutionMetadata {
    let mut merged = inner;
    let mut sources = outer.sources;
    sources.extend(std::mem::take(&mut merged.sources));
    merged.sources = sources;
    merged
}

fn reason_for(source: CandidateSource) -> ReasonCode {
    match source {
        CandidateSource::HintsProductRef => ReasonCode::HintsProductRef,
        CandidateSource::StableAlias => ReasonCode::StableAliasRef,
        CandidateSource::CacheMerchant => ReasonCode::CacheMerchantSearch,
        CandidateSource::CacheCrossMerchant => ReasonCode::CacheCrossMerchantSearch,
        CandidateSource::ScopedSearch => ReasonCode::CatalogSearchScoped,
        CandidateSource::GlobalSearch => ReasonCode::CatalogSearchGlobal,
        CandidateSource::SecondarySearch => ReasonCode::MultiMerchantInvoke,
    }
}

/// Internal outcome of one network stage.
enum StageResult {
    Relevant(Vec<ResolutionCandidate>),
    Irrelevant,
    Failed,
    Skipped,
}

/// Internal outcome of the whole cascade.
enum CascadeOutcome {
    Found(CandidateSource, Vec<ResolutionCandidate>),
    Empty(ReasonCode),
}
