//! Ambiguity gate and dedupe policy.
//!
//! The gate turns a scored candidate set plus intent signals into one of
//! three outcomes: resolved, clarify, or empty. Clarification is a deliberate
//! decision in the mid band, never a fallback for "nothing found", and the
//! two must never be conflated.


use tracing::debug;

use crate::intent::{IntentClass, QueryIntent};
use crate::model::{Clarification, ResolutionCandidate};
use crate::normalize::normalize_query;
use crate::scoring::{confidence_for, score_spread};

/// Default band edges. Empirically tuned against the target corpus; override
/// via config, never inline.
pub const DEFAULT_CLARIFY_THRESHOLD: f32 = 0.45;
pub const DEFAULT_STRICT_EMPTY_THRESHOLD: f32 = 0.8;

/// Candidate count at which the count component saturates.
const COUNT_SATURATION: f32 = 4.0;

/// Weights of the spread and count components of the ambiguity score.
const SPREAD_WEIGHT: f32 = 0.55;
const COUNT_WEIGHT: f32 = 0.35;

/// Banding configuration for the gate.
#[derive(Debug, Clone)]
pub struct AmbiguityThresholds {
    pub clarify: f32,
    pub strict_empty: f32,
    /// When disabled, the mid band degrades to empty instead of clarifying.
    pub medium_clarify_enabled: bool,
}

impl Default for AmbiguityThresholds {
    fn default() -> Self {
        Self {
            clarify: DEFAULT_CLARIFY_THRESHOLD,
            strict_empty: DEFAULT_STRICT_EMPTY_THRESHOLD,
            medium_clarify_enabled: true,
        }
    }
}

/// Outcome of the gate.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// Best candidate wins, with its derived confidence.
    Resolved {
        candidate: ResolutionCandidate,
        confidence: f32,
    },
    /// Mid-band ambiguity: ask instead of guessing.
    Clarify(Clarification),
    /// High ambiguity or nothing usable: strict empty.
    Empty,
}

impl GateDecision {
    pub fn is_resolved(&self) -> bool {
        matches!(self, GateDecision::Resolved { .. })
    }

    pub fn is_clarify(&self) -> bool {
        matches!(self, GateDecision::Clarify(_))
    }
}

/// Derives the ambiguity score in [0, 1] from set size, score spread and
/// intent class. Broad scenario/category queries expect diverse result sets,
/// so they discount the score; lookup queries do not.
pub fn ambiguity_score(candidates: &[ResolutionCandidate], intent: QueryIntent) -> f32 {
    if candidates.is_empty() {
        return 1.0;
    }
    let spread = score_spread(candidates);
    let count_component = ((candidates.len() as f32 - 1.0) / COUNT_SATURATION).min(1.0);
    let intent_discount = match intent.class {
        IntentClass::Scenario => 0.15,
        IntentClass::Category => 0.05,
        IntentClass::Lookup => 0.0,
    };
    (SPREAD_WEIGHT * (1.0 - spread) + COUNT_WEIGHT * count_component - intent_discount)
        .clamp(0.0, 1.0)
}

/// Runs the gate over an already scored, already ordered candidate set.
pub fn decide(
    candidates: &[ResolutionCandidate],
    intent: QueryIntent,
    thresholds: &AmbiguityThresholds,
) -> GateDecision {
    let Some(top) = candidates.first() else {
        return GateDecision::Empty;
    };

    let score = ambiguity_score(candidates, intent);
    debug!(
        score,
        clarify = thresholds.clarify,
        strict_empty = thresholds.strict_empty,
        candidates = candidates.len(),
        "ambiguity gate"
    );

    if score < thresholds.clarify {
        return GateDecision::Resolved {
            candidate: top.clone(),
            confidence: confidence_for(top),
        };
    }

    if score < thresholds.strict_empty && thresholds.medium_clarify_enabled {
        return GateDecision::Clarify(build_clarification(candidates));
    }

    GateDecision::Empty
}

fn build_clarification(candidates: &[ResolutionCandidate]) -> Clarification {
    let mut options = Vec::new();
    for c in candidates {
        let label = match &c.brand {
            Some(brand) if !c.title.to_lowercase().contains(&brand.to_lowercase()) => {
                format!("{} {}", brand, c.title)
            }
            _ => c.title.clone(),
        };
        if !options.contains(&label) {
            options.push(label);
        }
        if options.len() == 3 {
            break;
        }
    }
    Clarification {
        question: "I found a few close matches. Which one did you mean?".to_string(),
        options,
    }
}

/// Caps same-titled variants in a result list by intent class: scenario
/// queries keep shade/style diversity (3), category browses keep 2, direct
/// lookups keep 1.
pub fn dedupe_by_title(
    candidates: Vec<ResolutionCandidate>,
    class: IntentClass,
) -> Vec<ResolutionCandidate> {
    let cap = class.title_cap();
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    candidates
        .into_iter()
        .filter(|c| {
            let key = normalize_query(&c.title);
            let count = seen.entry(key).or_insert(0);
            *count += 1;
            *count <= cap
        })
        .collect()
}
