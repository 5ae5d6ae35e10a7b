//! Query normalization, opaque-ID detection and hint reconciliation.
//!
//! The reconciler turns a raw query plus an optional [`HintBundle`] into one
//! effective query string and a trust-annotated candidate reference. The
//! opaque-ID safety policy lives here: a UUID-shaped `product_id` is never
//! trusted on its own, no matter what the caller asserts.


use crate::model::{HintBundle, ProductRef};

/// Minimum length before a mixed alphanumeric token is considered opaque.
pub const OPAQUE_MIN_LEN: usize = 20;

/// Lowercases, strips punctuation noise and collapses whitespace.
///
/// Characters meaningful in product phrases (`%`, `+`, `-`, `.`, `&`) are
/// kept so curated alias keys like "niacinamide 10% + zinc 1%" survive.
pub fn normalize_query(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for c in raw.chars() {
        let keep = c.is_alphanumeric() || matches!(c, '%' | '+' | '-' | '.' | '&');
        if keep {
            out.extend(c.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim().to_string()
}

/// Splits a normalized string into scoring tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Returns `true` when `id` gives no evidence of being a native catalog key.
///
/// UUIDs are always opaque. Long mixed hex-and-dash tokens are opaque. Plain
/// numeric IDs and kebab-case slugs are platform-native shapes and are not.
pub fn is_opaque_id(id: &str) -> bool {
    let id = id.trim();
    if id.is_empty() {
        return true;
    }
    if uuid::Uuid::parse_str(id).is_ok() {
        return true;
    }
    if id.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    // Kebab/underscore slugs read as human-curated keys.
    if id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        && id.chars().any(|c| c.is_ascii_alphabetic())
        && id.len() < OPAQUE_MIN_LEN
    {
        return false;
    }
    let hexish = id
        .chars()
        .all(|c| c.is_ascii_hexdigit() || c == '-' || c == '_');
    let mixed = id.chars().any(|c| c.is_ascii_alphabetic())
        && id.chars().any(|c| c.is_ascii_digit());
    id.len() >= OPAQUE_MIN_LEN && hexish && mixed
}

/// Trust classification of a caller-asserted product reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintRefDisposition {
    /// Non-opaque ID; may resolve directly, merchant pairing optional.
    Trusted(ProductRef),
    /// Opaque ID paired with a merchant; usable only if the engine can
    /// independently verify the pair against the catalog.
    NeedsVerification(ProductRef),
    /// Opaque ID with no verifiable pairing; downgraded to lookup.
    NeedsLookup(ProductRef),
}

impl HintRefDisposition {
    pub fn product_ref(&self) -> &ProductRef {
        match self {
            HintRefDisposition::Trusted(r)
            | HintRefDisposition::NeedsVerification(r)
            | HintRefDisposition::NeedsLookup(r) => r,
        }
    }
}

/// Output of the normalizer: one canonical query plus hint annotations.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub effective_query: String,
    pub query_from_hints: bool,
    pub hint_ref: Option<HintRefDisposition>,
    pub hint_brand: Option<String>,
}

/// Reconciles the raw query with the hint bundle.
///
/// An opaque raw query (a pasted UUID, say) with a usable hint alias/title is
/// replaced by the hint text as the effective query. `prefer_merchants`
/// options never feed into trust here; only the ID shape and a merchant
/// pairing do.
pub fn reconcile(raw_query: &str, hints: Option<&HintBundle>) -> NormalizedRequest {
    let normalized = normalize_query(raw_query);

    let mut effective_query = normalized.clone();
    let mut query_from_hints = false;
    if is_opaque_id(raw_query.trim()) {
        if let Some(text) = hints.and_then(HintBundle::best_text) {
            effective_query = normalize_query(text);
            query_from_hints = true;
        }
    }

    let hint_ref = hints.and_then(|h| h.product_ref.clone()).map(|r| {
        if !is_opaque_id(&r.product_id) {
            HintRefDisposition::Trusted(r)
        } else if r.is_confirmed() {
            HintRefDisposition::NeedsVerification(r)
        } else {
            HintRefDisposition::NeedsLookup(r)
        }
    });

    NormalizedRequest {
        effective_query,
        query_from_hints,
        hint_ref,
        hint_brand: hints
            .and_then(|h| h.brand.as_deref())
            .map(normalize_query)
            .filter(|b| !b.is_empty()),
    }
}
