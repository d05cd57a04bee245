use std::sync::Arc;

use crate::achievements::{compute_monthly_trend, MonthlyAchievementRecord, TargetSummation};
use crate::catalog::CatalogStore;
use crate::error::{ApiError, ApiResult};
use crate::metrics::EngineMetrics;
use crate::orders::{OrderFilter, OrderStore};

/// Loads orders and products and computes the monthly trend
///
/// Every call recomputes from the stores; nothing is cached.
#[derive(Clone)]
pub struct TrendService {
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogStore>,
    default_year: i32,
    summation: TargetSummation,
    metrics: EngineMetrics,
}

impl TrendService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        catalog: Arc<dyn CatalogStore>,
        default_year: i32,
        summation: TargetSummation,
        metrics: EngineMetrics,
    ) -> Self {
        Self {
            orders,
            catalog,
            default_year,
            summation,
            metrics,
        }
    }

    /// Trend zero-filled for `year`, or the configured year when absent
    pub async fn monthly_trend(&self, year: Option<i32>) -> ApiResult<Vec<MonthlyAchievementRecord>> {
        let year = year.unwrap_or(self.default_year);
        if !(1..=9999).contains(&year) {
            return Err(ApiError::validation(format!(
                "year must be between 1 and 9999, got {}",
                year
            )));
        }

        let timer = self.metrics.start_trend_computation();
        let loaded = async {
            let orders = self.orders.find_all(&OrderFilter::default()).await?;
            let products = self.catalog.find_all_products().await?;
            Ok::<_, ApiError>((orders, products))
        }
        .await;

        let (orders, products) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                timer.cancel();
                return Err(e);
            }
        };

        let trend = compute_monthly_trend(&orders, &products, year, self.summation);
        tracing::debug!(year, orders = orders.len(), months = trend.len(), "Monthly trend computed");
        Ok(trend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalogStore, Product};
    use crate::orders::{InMemoryOrderStore, LineItem, Order, StatusLabel};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn service(
        orders: Arc<InMemoryOrderStore>,
        catalog: Arc<InMemoryCatalogStore>,
        metrics: EngineMetrics,
    ) -> TrendService {
        TrendService::new(orders, catalog, 2024, TargetSummation::PerLineItem, metrics)
    }

    #[tokio::test]
    async fn test_default_year_is_zero_filled() {
        let metrics = EngineMetrics::new();
        let trend = service(
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(InMemoryCatalogStore::new()),
            metrics.clone(),
        )
        .monthly_trend(None)
        .await
        .unwrap();

        assert_eq!(trend.len(), 12);
        assert_eq!(trend[0].month, "2024-01");
        assert_eq!(metrics.snapshot().trend_computations, 1);
    }

    #[tokio::test]
    async fn test_reads_orders_from_store() {
        let product = Product::new("PCM-500", "Paracetamol 500mg", dec!(2.5), 200);
        let catalog = Arc::new(InMemoryCatalogStore::with_products([product.clone()]));
        let orders = Arc::new(InMemoryOrderStore::new());
        orders
            .save(Order {
                id: Uuid::new_v4(),
                order_number: "ORD-0001".to_string(),
                pharmacy_id: Uuid::new_v4(),
                items: vec![LineItem {
                    product_id: product.id,
                    quantity: 50,
                    unit_price_at_order: product.unit_price,
                }],
                subtotal: dec!(125),
                discount_percent: Decimal::ZERO,
                total: dec!(125),
                settlement_status: true,
                status_label: StatusLabel::Normal,
                created_at: Utc.with_ymd_and_hms(2023, 3, 3, 10, 0, 0).unwrap(),
            })
            .await
            .unwrap();

        let trend = service(orders, catalog, EngineMetrics::new())
            .monthly_trend(Some(2023))
            .await
            .unwrap();

        assert_eq!(trend.len(), 12);
        assert_eq!(trend[2].month, "2023-03");
        assert_eq!(trend[2].total_achievement, 50);
        assert_eq!(trend[2].percentage, dec!(25));
    }

    #[tokio::test]
    async fn test_invalid_year_rejected() {
        let result = service(
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(InMemoryCatalogStore::new()),
            EngineMetrics::new(),
        )
        .monthly_trend(Some(0))
        .await;

        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }
}
