use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pharmacies::{DiscountOffer, Pharmacy, PharmacyRow};

/// Pharmacy discount registry
///
/// Offer mutation goes through `consume_offer` / `replace_offer` so each
/// backend can make it a single atomic write instead of read-decrement-save.
#[async_trait]
pub trait PharmacyStore: Send + Sync {
    async fn find_pharmacy(&self, id: Uuid) -> ApiResult<Option<Pharmacy>>;

    async fn save_pharmacy(&self, pharmacy: Pharmacy) -> ApiResult<Pharmacy>;

    /// Decrement the offer's remaining duration if it is > 0
    ///
    /// Returns the offer after consumption, or `None` when the pharmacy has
    /// no offer.
    async fn consume_offer(&self, id: Uuid) -> ApiResult<Option<DiscountOffer>>;

    /// Overwrite the pharmacy's offer wholesale
    async fn replace_offer(&self, id: Uuid, offer: DiscountOffer) -> ApiResult<Pharmacy>;
}

#[derive(Clone, Default)]
pub struct InMemoryPharmacyStore {
    pharmacies: Arc<RwLock<HashMap<Uuid, Pharmacy>>>,
}

impl InMemoryPharmacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pharmacies(pharmacies: impl IntoIterator<Item = Pharmacy>) -> Self {
        let map = pharmacies.into_iter().map(|p| (p.id, p)).collect();
        Self {
            pharmacies: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl PharmacyStore for InMemoryPharmacyStore {
    async fn find_pharmacy(&self, id: Uuid) -> ApiResult<Option<Pharmacy>> {
        Ok(self.pharmacies.read().await.get(&id).cloned())
    }

    async fn save_pharmacy(&self, pharmacy: Pharmacy) -> ApiResult<Pharmacy> {
        self.pharmacies.write().await.insert(pharmacy.id, pharmacy.clone());
        Ok(pharmacy)
    }

    async fn consume_offer(&self, id: Uuid) -> ApiResult<Option<DiscountOffer>> {
        let mut pharmacies = self.pharmacies.write().await;
        let pharmacy = pharmacies
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("pharmacy", id))?;

        Ok(pharmacy.offer.as_mut().map(|offer| {
            offer.consume();
            offer.clone()
        }))
    }

    async fn replace_offer(&self, id: Uuid, offer: DiscountOffer) -> ApiResult<Pharmacy> {
        let mut pharmacies = self.pharmacies.write().await;
        let pharmacy = pharmacies
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("pharmacy", id))?;
        pharmacy.offer = Some(offer);
        Ok(pharmacy.clone())
    }
}

/// Registry backed by the `pharmacies` table
#[derive(Clone)]
pub struct PgPharmacyStore {
    pool: PgPool,
}

impl PgPharmacyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PHARMACY_COLUMNS: &str = "id, name, discount_percent, discount_duration, discount_expires_at";

#[async_trait]
impl PharmacyStore for PgPharmacyStore {
    async fn find_pharmacy(&self, id: Uuid) -> ApiResult<Option<Pharmacy>> {
        let row = sqlx::query_as::<_, PharmacyRow>(&format!(
            "SELECT {PHARMACY_COLUMNS} FROM pharmacies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Pharmacy::from))
    }

    async fn save_pharmacy(&self, pharmacy: Pharmacy) -> ApiResult<Pharmacy> {
        let offer = pharmacy.offer.as_ref();
        let row = sqlx::query_as::<_, PharmacyRow>(&format!(
            r#"
            INSERT INTO pharmacies ({PHARMACY_COLUMNS})
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                discount_percent = EXCLUDED.discount_percent,
                discount_duration = EXCLUDED.discount_duration,
                discount_expires_at = EXCLUDED.discount_expires_at
            RETURNING {PHARMACY_COLUMNS}
            "#
        ))
        .bind(pharmacy.id)
        .bind(&pharmacy.name)
        .bind(offer.map(|o| o.percent))
        .bind(offer.map(|o| o.remaining_duration_units))
        .bind(offer.and_then(|o| o.expires_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn consume_offer(&self, id: Uuid) -> ApiResult<Option<DiscountOffer>> {
        // One conditional UPDATE, so concurrent orders cannot lose a decrement
        let row = sqlx::query_as::<_, PharmacyRow>(&format!(
            r#"
            UPDATE pharmacies
            SET discount_duration = CASE
                WHEN discount_duration > 0 THEN discount_duration - 1
                ELSE discount_duration
            END
            WHERE id = $1
            RETURNING {PHARMACY_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("pharmacy", id))?;

        Ok(Pharmacy::from(row).offer)
    }

    async fn replace_offer(&self, id: Uuid, offer: DiscountOffer) -> ApiResult<Pharmacy> {
        let row = sqlx::query_as::<_, PharmacyRow>(&format!(
            r#"
            UPDATE pharmacies
            SET discount_percent = $1, discount_duration = $2, discount_expires_at = $3
            WHERE id = $4
            RETURNING {PHARMACY_COLUMNS}
            "#
        ))
        .bind(offer.percent)
        .bind(offer.remaining_duration_units)
        .bind(offer.expires_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("pharmacy", id))?;

        Ok(row.into())
    }
}
