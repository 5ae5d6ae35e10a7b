//! Query-intent signals: scenario vs. category vs. direct lookup, plus the
//! target-object domain used for domain-aware re-ranking.

#[cfg(test)]
mod tests;

use crate::normalize::tokenize;

/// Phrases marking a scenario-style query ("something for date night").
const SCENARIO_MARKERS: &[&str] = &[
    "for a",
    "for my",
    "routine",
    "date night",
    "wedding",
    "gift",
    "what should",
    "going to",
    "outfit for",
    "trip",
    "occasion",
];

/// Generic category nouns; a short query built around one of these, with no
/// brand-specific token, reads as a category browse.
const CATEGORY_TERMS: &[&str] = &[
    "cleanser",
    "cleansers",
    "moisturizer",
    "moisturizers",
    "serum",
    "serums",
    "sunscreen",
    "sunscreens",
    "mascara",
    "mascaras",
    "lipstick",
    "lipsticks",
    "shampoo",
    "toner",
    "dress",
    "dresses",
    "shoes",
    "sneakers",
    "jacket",
    "jackets",
];

const PET_MARKERS: &[&str] = &["dog", "dogs", "cat", "cats", "pet", "pets", "puppy", "kitten"];
const TOY_MARKERS: &[&str] = &["toy", "toys", "doll", "dolls", "plush", "figurine", "playset"];

/// How the query is shaped, which drives clarification and dedupe behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentClass {
    /// Open-ended "help me find something for X" queries.
    Scenario,
    /// Category browses ("moisturizers").
    Category,
    /// Direct brand/product lookups, where precision matters most.
    Lookup,
}

impl IntentClass {
    /// Maximum same-titled variants allowed in a returned list.
    #[inline]
    pub fn title_cap(&self) -> usize {
        match self {
            IntentClass::Scenario => 3,
            IntentClass::Category => 2,
            IntentClass::Lookup => 1,
        }
    }
}

/// Domain of the object the query is shopping for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDomain {
    Human,
    Pet,
    Toy,
}

impl TargetDomain {
    /// Title vocabulary that signals a *different* domain than this one.
    /// Matching titles are penalized below same-domain candidates.
    pub fn exclusion_terms(&self) -> Vec<&'static str> {
        let mut terms = Vec::new();
        if *self != TargetDomain::Pet {
            terms.extend_from_slice(PET_MARKERS);
        }
        if *self != TargetDomain::Toy {
            terms.extend_from_slice(TOY_MARKERS);
        }
        terms
    }
}

/// Combined intent signals for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryIntent {
    pub class: IntentClass,
    pub target: TargetDomain,
}

/// Classifies a normalized query.
pub fn classify(query: &str) -> QueryIntent {
    let tokens = tokenize(query);
    let target = if tokens.iter().any(|t| PET_MARKERS.contains(&t.as_str())) {
        TargetDomain::Pet
    } else if tokens.iter().any(|t| TOY_MARKERS.contains(&t.as_str())) {
        TargetDomain::Toy
    } else {
        TargetDomain::Human
    };

    let class = if SCENARIO_MARKERS.iter().any(|m| query.contains(m)) {
        IntentClass::Scenario
    } else if tokens.len() <= 3
        && tokens.iter().any(|t| CATEGORY_TERMS.contains(&t.as_str()))
    {
        IntentClass::Category
    } else {
        IntentClass::Lookup
    };

    QueryIntent { class, target }
}

/// Returns `true` if `title` trips the exclusion vocabulary for `target`.
pub fn title_is_cross_domain(title: &str, target: TargetDomain) -> bool {
    let terms = target.exclusion_terms();
    tokenize(title).iter().any(|t| terms.contains(&t.as_str()))
}
