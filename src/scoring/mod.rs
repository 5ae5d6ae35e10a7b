//! Relevance filtering and confidence assignment for cascade candidates.
//!
//! A structurally valid row can still be irrelevant: a brand-specific query
//! matched against an unrelated category must not resolve. The scorer measures
//! token/brand overlap against the effective query, drops anything below the
//! configured minimum, and orders what survives.


use std::cmp::Ordering;

use tracing::debug;

use crate::model::{ResolutionCandidate, ResolveOptions, SourceType};
use crate::normalize::tokenize;

/// Minimum token overlap for a candidate to count as relevant.
pub const DEFAULT_MIN_OVERLAP: f32 = 0.34;

/// Overlap bonus when the candidate's brand appears in the query or hint.
const BRAND_BONUS: f32 = 0.2;

/// Confidence ceilings by stage certainty. An alias hit is always 1.0 and
/// never passes through here.
const DIRECT_CONFIDENCE_BASE: f32 = 0.6;
const DIRECT_CONFIDENCE_SPAN: f32 = 0.35;
const FALLBACK_CONFIDENCE_BASE: f32 = 0.45;
const FALLBACK_CONFIDENCE_SPAN: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    min_overlap: f32,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_OVERLAP)
    }
}

impl RelevanceScorer {
    pub fn new(min_overlap: f32) -> Self {
        Self { min_overlap }
    }

    pub fn min_overlap(&self) -> f32 {
        self.min_overlap
    }

    /// Filters, scores and orders a candidate set.
    ///
    /// External-seed rows are dropped unless the caller opted in. Relevance
    /// ties go to `prefer_merchants` members; remaining ties keep
    /// cascade-discovery order (the sort is stable).
    pub fn score(
        &self,
        effective_query: &str,
        hint_brand: Option<&str>,
        candidates: Vec<ResolutionCandidate>,
        opts: &ResolveOptions,
    ) -> Vec<ResolutionCandidate> {
        let query_tokens = tokenize(effective_query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ResolutionCandidate> = candidates
            .into_iter()
            .filter(|c| opts.include_external_seeds || c.source_type != SourceType::ExternalSeed)
            .filter_map(|mut c| {
                let overlap = self.overlap(&query_tokens, hint_brand, &c);
                if overlap < self.min_overlap {
                    debug!(
                        product_id = %c.product_ref.product_id,
                        overlap,
                        min = self.min_overlap,
                        "candidate below relevance minimum"
                    );
                    return None;
                }
                c.score = overlap;
                Some(c)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    let a_pref = is_preferred(a, opts);
                    let b_pref = is_preferred(b, opts);
                    b_pref.cmp(&a_pref)
                })
        });

        scored
    }

    fn overlap(
        &self,
        query_tokens: &[String],
        hint_brand: Option<&str>,
        candidate: &ResolutionCandidate,
    ) -> f32 {
        let mut row_tokens = tokenize(&candidate.title);
        if let Some(brand) = &candidate.brand {
            row_tokens.extend(tokenize(brand));
        }

        let matched = query_tokens
            .iter()
            .filter(|t| row_tokens.contains(t))
            .count();
        let mut overlap = matched as f32 / query_tokens.len() as f32;

        if let Some(brand) = &candidate.brand {
            let brand_tokens = tokenize(brand);
            let brand_in_query = !brand_tokens.is_empty()
                && brand_tokens.iter().all(|t| query_tokens.contains(t));
            let brand_in_hint = hint_brand
                .map(|h| tokenize(h) == brand_tokens)
                .unwrap_or(false);
            if brand_in_query || brand_in_hint {
                overlap += BRAND_BONUS;
            }
        }

        overlap.min(1.0)
    }
}

fn is_preferred(candidate: &ResolutionCandidate, opts: &ResolveOptions) -> bool {
    candidate
        .product_ref
        .merchant_id
        .as_deref()
        .map(|m| opts.prefer_merchants.iter().any(|p| p == m))
        .unwrap_or(false)
}

/// Confidence of resolving to `candidate`, proportional to stage certainty:
/// direct cache/search hits sit above rows retrieved only after a fallback.
pub fn confidence_for(candidate: &ResolutionCandidate) -> f32 {
    let (base, span) = if candidate.source.is_fallback() {
        (FALLBACK_CONFIDENCE_BASE, FALLBACK_CONFIDENCE_SPAN)
    } else {
        (DIRECT_CONFIDENCE_BASE, DIRECT_CONFIDENCE_SPAN)
    };
    (base + span * candidate.score).clamp(0.0, 0.99)
}

/// Score spread between the top two candidates; 1.0 for a lone candidate.
pub fn score_spread(candidates: &[ResolutionCandidate]) -> f32 {
    match candidates {
        [] => 0.0,
        [_] => 1.0,
        [first, second, ..] => (first.score - second.score).max(0.0),
    }
}
