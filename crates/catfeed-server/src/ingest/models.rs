//! Feed and SKU record models

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::categories::CategoryLevels;
use super::{IngestError, Result, MARKETPLACE_ID};

/// One `<category>` entry from the feed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display name
    pub name: String,
    /// Parent category id, if any
    pub parent_id: Option<String>,
}

/// One `<offer>` element from the feed, pre-persistence.
///
/// Constructed per XML element by the offer cursor and consumed immediately
/// by the pipeline; offers are never buffered in bulk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Offer {
    /// External offer id (the `id` attribute)
    pub offer_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    /// Raw barcode text; normalized to a numeric value at record build time
    pub barcode: Option<String>,
    pub category_id: Option<String>,
    pub currency_id: Option<String>,
    /// Raw price text; may be absent or malformed
    pub price: Option<String>,
    pub picture: Option<String>,
    /// Arbitrary name -> value parameter mapping from `<param>` elements
    pub params: BTreeMap<String, String>,
}

/// A SKU record ready for insertion.
#[derive(Debug, Clone, Serialize)]
pub struct NewSku {
    pub uuid: Uuid,
    pub marketplace_id: i32,
    pub product_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub barcode: Option<i64>,
    pub category_id: Option<i32>,
    pub category_lvl_1: Option<String>,
    pub category_lvl_2: Option<String>,
    pub category_lvl_3: Option<String>,
    pub category_remaining: Option<String>,
    pub features: serde_json::Value,
    pub price_after_discounts: Option<f64>,
    pub first_image_url: Option<String>,
    pub currency: Option<String>,
}

impl NewSku {
    /// Build a SKU record from an offer and its resolved category levels.
    ///
    /// A non-numeric offer id fails the record (and with it the job); a
    /// non-numeric barcode or price is stored as absent.
    pub fn from_offer(offer: &Offer, levels: &CategoryLevels) -> Result<Self> {
        let product_id: i64 = offer.offer_id.parse().map_err(|_| {
            IngestError::FeedParse(format!("offer id '{}' is not numeric", offer.offer_id))
        })?;

        let features = serde_json::Value::Object(
            offer
                .params
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        );

        Ok(Self {
            uuid: Uuid::new_v4(),
            marketplace_id: MARKETPLACE_ID,
            product_id,
            title: offer.name.clone(),
            description: offer.description.clone(),
            brand: offer.vendor.clone(),
            barcode: offer.barcode.as_deref().and_then(normalize_barcode),
            category_id: offer.category_id.as_deref().and_then(|id| id.parse().ok()),
            category_lvl_1: levels.lvl_1.clone(),
            category_lvl_2: levels.lvl_2.clone(),
            category_lvl_3: levels.lvl_3.clone(),
            category_remaining: levels.remaining.clone(),
            features,
            price_after_discounts: offer.price.as_deref().and_then(|p| p.trim().parse().ok()),
            first_image_url: offer.picture.clone(),
            currency: offer.currency_id.clone(),
        })
    }
}

/// Normalize a raw barcode to its numeric value.
///
/// Barcodes that are absent, non-numeric, or too large to represent are
/// stored as absent rather than raising an error.
fn normalize_barcode(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}
