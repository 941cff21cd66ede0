//! SKU storage operations

use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::ingest::NewSku;

/// A persisted SKU row.
///
/// Stable identity is the (marketplace_id, product_id) pair; `uuid` is the
/// immutable surrogate identifier assigned at creation and used as the search
/// document id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Sku {
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
    pub features: Option<serde_json::Value>,
    pub price_after_discounts: Option<f64>,
    pub first_image_url: Option<String>,
    pub currency: Option<String>,
    pub similar_sku: Option<Vec<Uuid>>,
}

const SKU_COLUMNS: &str = "uuid, marketplace_id, product_id, title, description, brand, barcode, \
     category_id, category_lvl_1, category_lvl_2, category_lvl_3, category_remaining, \
     features, price_after_discounts, first_image_url, currency, similar_sku";

/// Storage handler for SKU records
#[derive(Debug, Clone)]
pub struct SkuStore {
    db: PgPool,
}

impl SkuStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Begin a transaction for a streaming load or an enrichment sweep.
    pub async fn begin(&self) -> sqlx::Result<Transaction<'static, Postgres>> {
        self.db.begin().await
    }

    /// Empty the table, resetting identity and cascading to dependents.
    pub async fn reset(&self) -> sqlx::Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("TRUNCATE TABLE sku RESTART IDENTITY CASCADE")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Cleared sku table");
        Ok(())
    }

    /// Point lookup by surrogate id.
    pub async fn get_by_uuid(&self, uuid: Uuid) -> sqlx::Result<Option<Sku>> {
        sqlx::query_as::<_, Sku>(&format!("SELECT {SKU_COLUMNS} FROM sku WHERE uuid = $1"))
            .bind(uuid)
            .fetch_optional(&self.db)
            .await
    }

    /// Bulk lookup by surrogate ids, used to expand a similar-SKU set.
    pub async fn fetch_by_uuids(&self, uuids: &[Uuid]) -> sqlx::Result<Vec<Sku>> {
        sqlx::query_as::<_, Sku>(&format!("SELECT {SKU_COLUMNS} FROM sku WHERE uuid = ANY($1)"))
            .bind(uuids)
            .fetch_all(&self.db)
            .await
    }
}

/// Insert a SKU unless a record with the same (marketplace_id, product_id)
/// already exists. Returns whether a row was written.
///
/// The found branch is deliberately a no-op: re-ingesting an existing
/// external id never silently duplicates or updates.
pub async fn insert_if_absent(
    tx: &mut Transaction<'_, Postgres>,
    sku: &NewSku,
) -> sqlx::Result<bool> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT uuid FROM sku WHERE marketplace_id = $1 AND product_id = $2")
            .bind(sku.marketplace_id)
            .bind(sku.product_id)
            .fetch_optional(&mut **tx)
            .await?;

    if existing.is_some() {
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO sku (uuid, marketplace_id, product_id, title, description, brand, barcode, \
         category_id, category_lvl_1, category_lvl_2, category_lvl_3, category_remaining, \
         features, price_after_discounts, first_image_url, currency) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(sku.uuid)
    .bind(sku.marketplace_id)
    .bind(sku.product_id)
    .bind(&sku.title)
    .bind(&sku.description)
    .bind(&sku.brand)
    .bind(sku.barcode)
    .bind(sku.category_id)
    .bind(&sku.category_lvl_1)
    .bind(&sku.category_lvl_2)
    .bind(&sku.category_lvl_3)
    .bind(&sku.category_remaining)
    .bind(&sku.features)
    .bind(sku.price_after_discounts)
    .bind(&sku.first_image_url)
    .bind(&sku.currency)
    .execute(&mut **tx)
    .await?;

    Ok(true)
}

/// Fetch every persisted SKU inside the sweep transaction.
pub async fn fetch_all(tx: &mut Transaction<'_, Postgres>) -> sqlx::Result<Vec<Sku>> {
    sqlx::query_as::<_, Sku>(&format!("SELECT {SKU_COLUMNS} FROM sku"))
        .fetch_all(&mut **tx)
        .await
}

/// Overwrite a SKU's related-record set.
pub async fn set_similar(
    tx: &mut Transaction<'_, Postgres>,
    uuid: Uuid,
    similar: &[Uuid],
) -> sqlx::Result<()> {
    sqlx::query("UPDATE sku SET similar_sku = $2, updated_at = now() WHERE uuid = $1")
        .bind(uuid)
        .bind(similar)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
