//! Row and snapshot types for the materialized product cache.
//!
//! The cache itself is owned by an external refresh process; this engine only
//! ever reads a snapshot of it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::SourceType;

/// Sellability state of a cached row. Only `Published` rows are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Published,
    Draft,
    Archived,
}

/// One product row materialized into the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedProduct {
    pub merchant_id: String,
    pub product_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub status: ProductStatus,
    pub in_stock: bool,
    pub source_type: SourceType,
}

/// Merchant onboarding/approval state joined against cache rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantApproval {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of the product cache plus merchant approvals.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub products: Vec<CachedProduct>,
    pub approvals: HashMap<String, MerchantApproval>,
    pub refreshed_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            approvals: HashMap::new(),
            refreshed_at: Utc::now(),
        }
    }
}

/// Which retrieval path a store lookup used, exposed in response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSource {
    pub source: String,
    pub used: bool,
}
