//! SKU read routes

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use super::AppState;
use crate::db::Sku;
use crate::error::{AppError, AppResult};

/// Fetch one SKU by its surrogate id, with similar records expanded
///
/// GET /sku/:uuid
pub async fn get_sku(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let sku = state
        .store
        .get_by_uuid(uuid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("SKU {uuid} not found")))?;

    let similar_ids = sku.similar_sku.clone().unwrap_or_default();
    let similar = if similar_ids.is_empty() {
        Vec::new()
    } else {
        state.store.fetch_by_uuids(&similar_ids).await?
    };

    Ok(Json(render_sku(&sku, &similar_ids, &similar)))
}

/// Render a SKU with its similar set expanded to (uuid, title) pairs.
///
/// The expansion preserves the ranked order stored on the record, not the
/// arbitrary order the lookup returns.
fn render_sku(sku: &Sku, similar_ids: &[Uuid], similar: &[Sku]) -> Value {
    let similar_json: Vec<Value> = similar_ids
        .iter()
        .filter_map(|id| similar.iter().find(|s| s.uuid == *id))
        .map(|s| {
            json!({
                "uuid": s.uuid,
                "title": s.title,
            })
        })
        .collect();

    json!({
        "uuid": sku.uuid,
        "marketplace_id": sku.marketplace_id,
        "product_id": sku.product_id,
        "title": sku.title,
        "description": sku.description,
        "brand": sku.brand,
        "barcode": sku.barcode,
        "category_id": sku.category_id,
        "category_lvl_1": sku.category_lvl_1,
        "category_lvl_2": sku.category_lvl_2,
        "category_lvl_3": sku.category_lvl_3,
        "category_remaining": sku.category_remaining,
        "features": sku.features,
        "price_after_discounts": sku.price_after_discounts,
        "first_image_url": sku.first_image_url,
        "currency": sku.currency,
        "similar_sku": similar_json,
    })
}
