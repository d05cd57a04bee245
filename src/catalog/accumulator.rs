// Achievement Accumulator
//
// Increments per-product achievement counters when an order is committed.
// Increments add up (N calls of 1 == one call of N) but a retried increment
// counts twice; callers invoke it exactly once per line item per order.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::error::{ApiError, ApiResult};

#[async_trait]
pub trait AchievementAccumulator: Send + Sync {
    async fn increment_achievement(&self, product_id: Uuid, quantity: i32) -> ApiResult<()>;

    /// Increment every `(product, quantity)` pair of one order
    async fn increment_all(&self, items: &[(Uuid, i32)]) -> ApiResult<()> {
        for (product_id, quantity) in items {
            self.increment_achievement(*product_id, *quantity).await?;
        }
        Ok(())
    }
}

/// Accumulator that writes straight into the catalog store
#[derive(Clone)]
pub struct CatalogAccumulator {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogAccumulator {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }
}

fn checked_quantity(product_id: Uuid, quantity: i32) -> ApiResult<i64> {
    if quantity <= 0 {
        return Err(ApiError::validation(format!(
            "achievement increment for product {} must be positive, got {}",
            product_id, quantity
        )));
    }
    Ok(i64::from(quantity))
}

#[async_trait]
impl AchievementAccumulator for CatalogAccumulator {
    async fn increment_achievement(&self, product_id: Uuid, quantity: i32) -> ApiResult<()> {
        let delta = checked_quantity(product_id, quantity)?;
        self.catalog.update_product_achievement(product_id, delta).await
    }

    async fn increment_all(&self, items: &[(Uuid, i32)]) -> ApiResult<()> {
        let deltas = items
            .iter()
            .map(|(product_id, quantity)| Ok((*product_id, checked_quantity(*product_id, *quantity)?)))
            .collect::<ApiResult<Vec<_>>>()?;

        self.catalog.apply_achievement_deltas(&deltas).await?;
        tracing::debug!(products = deltas.len(), "Achievement counters incremented");
        Ok(())
    }
}
