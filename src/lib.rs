//! Pinpoint library crate (used by the server binary and integration tests).
//!
//! # Public API Surface
//!
//! The exports are organized by module:
//!
//! ## Core Types (Stable)
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`Resolver`], [`ResolverConfig`] - The resolution cascade engine
//! - [`ResolutionResult`], [`ResolutionCandidate`], [`ProductRef`] - Wire contract
//! - [`CatalogStore`], [`CatalogSnapshot`] - Cache-first lexical store
//!
//! ## Cascade Building Blocks
//! - [`AliasTable`] - Curated stable alias entries
//! - [`TimeBudget`] / [`with_retry`] - Shared per-request budget + retry
//! - [`RelevanceScorer`] - Relevance filtering and confidence
//! - [`AmbiguityThresholds`] / [`GateDecision`] - The ambiguity gate
//!
//! ## Upstream Access
//! - [`SearchBackend`] - Backend trait over the live search APIs
//! - [`CatalogSearchClient`] - reqwest implementation
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod alias;
pub mod ambiguity;
pub mod budget;
pub mod config;
pub mod gateway;
pub mod intent;
pub mod model;
pub mod normalize;
pub mod resolver;
pub mod scoring;
pub mod store;
pub mod upstream;

pub use alias::{AliasEntry, AliasTable, AliasTableBuilder, AliasTableHandle};
pub use ambiguity::{
    AmbiguityThresholds, DEFAULT_CLARIFY_THRESHOLD, DEFAULT_STRICT_EMPTY_THRESHOLD, GateDecision,
    ambiguity_score, decide, dedupe_by_title,
};
pub use budget::{
    DEFAULT_REQUEST_BUDGET, RETRY_BACKOFF, RetryOutcome, TimeBudget, Transient, with_retry,
};
pub use config::{Config, ConfigError};
pub use gateway::{GatewayError, HandlerState, create_router_with_state};
pub use intent::{IntentClass, QueryIntent, TargetDomain, classify};
pub use model::{
    CandidateSource, Clarification, HintBundle, PINPOINT_SOURCE_HEADER, ProductRef,
    ProxySearchFallback, ReasonCode, ResolutionCandidate, ResolutionMetadata, ResolutionResult,
    ResolveOptions, SourceOutcome, SourceType,
};
pub use normalize::{HintRefDisposition, NormalizedRequest, is_opaque_id, normalize_query, reconcile};
pub use resolver::{ProductSearch, ResolveError, ResolveResult, Resolver, ResolverConfig};
pub use scoring::{DEFAULT_MIN_OVERLAP, RelevanceScorer, confidence_for, score_spread};
pub use store::{
    CachedProduct, CatalogSnapshot, CatalogStore, MerchantApproval, ProductStatus, StoreLookup,
};
pub use upstream::{
    CatalogSearchClient, SearchBackend, SearchResponse, SearchScope, UpstreamError, UpstreamResult,
    UpstreamRow,
};

#[cfg(any(test, feature = "mock"))]
pub use upstream::{MockSearchBackend, RecordedCall};
