//! Stable alias table: hand-curated brand+product phrases mapped to canonical
//! references.
//!
//! The table is built once at process start and injected by reference into
//! every request's cascade. It never mutates at runtime, which keeps it
//! trivially thread-safe, and a lookup never touches the time budget.


use std::collections::HashMap;
use std::sync::Arc;

use crate::model::ProductRef;
use crate::normalize::normalize_query;

/// One curated alias entry.
#[derive(Debug, Clone)]
pub struct AliasEntry {
    /// Stable key identifying the curated entry, surfaced as
    /// `metadata.stable_alias_match_id`.
    pub match_id: String,
    pub product_ref: ProductRef,
    pub title: String,
    pub brand: String,
}

/// Immutable exact-match index keyed by the normalized phrase.
#[derive(Debug, Default)]
pub struct AliasTable {
    entries: HashMap<String, AliasEntry>,
}

impl AliasTable {
    pub fn builder() -> AliasTableBuilder {
        AliasTableBuilder::default()
    }

    /// The out-of-band curated set shipped with the gateway.
    pub fn curated() -> Self {
        Self::builder()
            .entry(
                "The Ordinary Niacinamide 10% + Zinc 1%",
                "the-ordinary-niacinamide-10-zinc-1",
                ProductRef::new("glowmart", "1043912"),
                "The Ordinary Niacinamide 10% + Zinc 1% 30ml",
                "The Ordinary",
            )
            .entry(
                "CeraVe Foaming Facial Cleanser",
                "cerave-foaming-facial-cleanser",
                ProductRef::new("dermstore", "3320041"),
                "CeraVe Foaming Facial Cleanser 473ml",
                "CeraVe",
            )
            .entry(
                "La Roche-Posay Anthelios Melt-in Milk SPF 60",
                "lrp-anthelios-melt-in-milk-spf60",
                ProductRef::new("dermstore", "3317755"),
                "La Roche-Posay Anthelios Melt-in Milk Sunscreen SPF 60",
                "La Roche-Posay",
            )
            .entry(
                "Maybelline Sky High Mascara",
                "maybelline-sky-high-mascara",
                ProductRef::new("beautyhub", "772910"),
                "Maybelline Lash Sensational Sky High Mascara",
                "Maybelline",
            )
            .build()
    }

    /// Exact lookup on the normalized phrase. O(1) amortized.
    pub fn lookup(&self, query: &str) -> Option<&AliasEntry> {
        self.entries.get(&normalize_query(query))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder collecting curated entries before freezing the table.
#[derive(Debug, Default)]
pub struct AliasTableBuilder {
    entries: HashMap<String, AliasEntry>,
}

impl AliasTableBuilder {
    pub fn entry(
        mut self,
        phrase: &str,
        match_id: &str,
        product_ref: ProductRef,
        title: &str,
        brand: &str,
    ) -> Self {
        self.entries.insert(
            normalize_query(phrase),
            AliasEntry {
                match_id: match_id.to_string(),
                product_ref,
                title: title.to_string(),
                brand: brand.to_string(),
            },
        );
        self
    }

    pub fn build(self) -> AliasTable {
        AliasTable {
            entries: self.entries,
        }
    }
}

/// Shared process-lifetime handle to the table.
pub type AliasTableHandle = Arc<AliasTable>;
