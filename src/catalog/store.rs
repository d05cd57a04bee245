use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::Product;
use crate::error::{ApiError, ApiResult};

/// Read access to products plus the achievement counter writes
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_product(&self, id: Uuid) -> ApiResult<Option<Product>>;

    async fn find_all_products(&self) -> ApiResult<Vec<Product>>;

    /// Add `delta` to a product's cumulative achievement
    async fn update_product_achievement(&self, id: Uuid, delta: i64) -> ApiResult<()>;

    /// Apply several achievement deltas
    ///
    /// The default applies them one write at a time, so a failure part-way
    /// leaves the earlier deltas in place.
    async fn apply_achievement_deltas(&self, deltas: &[(Uuid, i64)]) -> ApiResult<()> {
        for (id, delta) in deltas {
            self.update_product_achievement(*id, *delta).await?;
        }
        Ok(())
    }

    /// Administrative reset of the counter back to zero
    async fn reset_achievement(&self, id: Uuid) -> ApiResult<Product>;

    async fn upsert_product(&self, product: Product) -> ApiResult<Product>;
}

/// Catalog held in process memory
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    products: Arc<RwLock<HashMap<Uuid, Product>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let map = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            products: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_product(&self, id: Uuid) -> ApiResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_all_products(&self) -> ApiResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(products)
    }

    async fn update_product_achievement(&self, id: Uuid, delta: i64) -> ApiResult<()> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("product", id))?;
        product.cumulative_achievement += delta;
        Ok(())
    }

    async fn apply_achievement_deltas(&self, deltas: &[(Uuid, i64)]) -> ApiResult<()> {
        // Single write guard; check every id before touching any counter
        let mut products = self.products.write().await;
        if let Some((missing, _)) = deltas.iter().find(|(id, _)| !products.contains_key(id)) {
            return Err(ApiError::not_found("product", missing));
        }
        for (id, delta) in deltas {
            if let Some(product) = products.get_mut(id) {
                product.cumulative_achievement += delta;
            }
        }
        Ok(())
    }

    async fn reset_achievement(&self, id: Uuid) -> ApiResult<Product> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("product", id))?;
        product.cumulative_achievement = 0;
        Ok(product.clone())
    }

    async fn upsert_product(&self, product: Product) -> ApiResult<Product> {
        self.products.write().await.insert(product.id, product.clone());
        Ok(product)
    }
}

/// Catalog backed by the `products` table
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "id, sku, name, unit_price, cumulative_achievement, target";

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_product(&self, id: Uuid) -> ApiResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn find_all_products(&self) -> ApiResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sku"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn update_product_achievement(&self, id: Uuid, delta: i64) -> ApiResult<()> {
        let result = sqlx::query(
            "UPDATE products SET cumulative_achievement = cumulative_achievement + $1 WHERE id = $2",
        )
        .bind(delta)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("product", id));
        }
        Ok(())
    }

    async fn apply_achievement_deltas(&self, deltas: &[(Uuid, i64)]) -> ApiResult<()> {
        // All-or-nothing: the transaction rolls back when dropped on error
        let mut tx = self.pool.begin().await?;

        for (id, delta) in deltas {
            let result = sqlx::query(
                "UPDATE products SET cumulative_achievement = cumulative_achievement + $1 WHERE id = $2",
            )
            .bind(delta)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(ApiError::not_found("product", id));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn reset_achievement(&self, id: Uuid) -> ApiResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET cumulative_achievement = 0 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("product", id))
    }

    async fn upsert_product(&self, product: Product) -> ApiResult<Product> {
        let saved = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products ({PRODUCT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                sku = EXCLUDED.sku,
                name = EXCLUDED.name,
                unit_price = EXCLUDED.unit_price,
                cumulative_achievement = EXCLUDED.cumulative_achievement,
                target = EXCLUDED.target
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.unit_price)
        .bind(product.cumulative_achievement)
        .bind(product.target)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_update_achievement_accumulates() {
        let product = Product::new("AMX-250", "Amoxicillin 250mg", dec!(12.50), 100);
        let store = InMemoryCatalogStore::with_products([product.clone()]);

        store.update_product_achievement(product.id, 3).await.unwrap();
        store.update_product_achievement(product.id, 4).await.unwrap();

        let stored = store.find_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.cumulative_achievement, 7);
    }

    #[tokio::test]
    async fn test_update_unknown_product_is_not_found() {
        let store = InMemoryCatalogStore::new();
        let result = store.update_product_achievement(Uuid::new_v4(), 1).await;
        assert!(matches!(result, Err(ApiError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_batch_deltas_touch_nothing_when_one_id_is_unknown() {
        let product = Product::new("IBU-400", "Ibuprofen 400mg", dec!(8), 50);
        let store = InMemoryCatalogStore::with_products([product.clone()]);

        let result = store
            .apply_achievement_deltas(&[(product.id, 5), (Uuid::new_v4(), 2)])
            .await;

        assert!(result.is_err());
        let stored = store.find_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.cumulative_achievement, 0);
    }

    #[tokio::test]
    async fn test_reset_achievement() {
        let mut product = Product::new("MET-500", "Metformin 500mg", dec!(4.20), 200);
        product.cumulative_achievement = 42;
        let store = InMemoryCatalogStore::with_products([product.clone()]);

        let reset = store.reset_achievement(product.id).await.unwrap();
        assert_eq!(reset.cumulative_achievement, 0);
        assert_eq!(reset.target, 200);
    }

    #[tokio::test]
    async fn test_find_all_sorted_by_sku() {
        let store = InMemoryCatalogStore::with_products([
            Product::new("ZNC-20", "Zinc", dec!(1), 10),
            Product::new("ASP-75", "Aspirin", dec!(2), 10),
        ]);

        let skus: Vec<String> = store
            .find_all_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.sku)
            .collect();
        assert_eq!(skus, vec!["ASP-75", "ZNC-20"]);
    }
}
