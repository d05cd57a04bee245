use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalog::{AchievementAccumulator, CatalogStore};
use crate::error::{ApiError, ApiResult};
use crate::metrics::EngineMetrics;
use crate::orders::order_number::format_order_number;
use crate::orders::{
    AcceptOrderRequest, AcceptedOrder, CreateOrderRequest, DiscountSource, LineItem, Order,
    OrderFilter, OrderStore, PriceCalculator, PricedOrder, SettlementUpdate, StatusLabel,
};
use crate::pharmacies::{DiscountOffer, PharmacyStore};

/// Service for order pricing and the order lifecycle
///
/// Every collaborator is injected, so the in-memory and PostgreSQL stores
/// are interchangeable.
#[derive(Clone)]
pub struct OrderService {
    catalog: Arc<dyn CatalogStore>,
    pharmacies: Arc<dyn PharmacyStore>,
    orders: Arc<dyn OrderStore>,
    accumulator: Arc<dyn AchievementAccumulator>,
    metrics: EngineMetrics,
    // Serializes number allocation + save within this process
    allocation_lock: Arc<Mutex<()>>,
}

impl OrderService {
    /// Create a new OrderService
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        pharmacies: Arc<dyn PharmacyStore>,
        orders: Arc<dyn OrderStore>,
        accumulator: Arc<dyn AchievementAccumulator>,
    ) -> Self {
        Self::with_metrics(catalog, pharmacies, orders, accumulator, EngineMetrics::new())
    }

    /// Create a new OrderService sharing an existing metrics registry
    pub fn with_metrics(
        catalog: Arc<dyn CatalogStore>,
        pharmacies: Arc<dyn PharmacyStore>,
        orders: Arc<dyn OrderStore>,
        accumulator: Arc<dyn AchievementAccumulator>,
        metrics: EngineMetrics,
    ) -> Self {
        Self {
            catalog,
            pharmacies,
            orders,
            accumulator,
            metrics,
            allocation_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Price an order without persisting anything
    ///
    /// # Validation
    /// - At least one line item
    /// - Every quantity is a positive integer
    /// - Every product exists; its current unit price is captured
    /// - The pharmacy exists
    /// - An explicit discount lies within 0..=100
    pub async fn price_order(
        &self,
        request: &CreateOrderRequest,
        now: DateTime<Utc>,
    ) -> ApiResult<PricedOrder> {
        if request.items.is_empty() {
            return Err(ApiError::validation("no line items"));
        }

        if let Some(discount) = request.discount {
            validate_percent(discount, "discount")?;
        }

        let mut items = Vec::with_capacity(request.items.len());
        for (index, item) in request.items.iter().enumerate() {
            if item.quantity <= 0 {
                return Err(ApiError::validation(format!(
                    "line item {}: quantity must be a positive integer, got {}",
                    index, item.quantity
                )));
            }

            let product = self
                .catalog
                .find_product(item.product_id)
                .await?
                .ok_or_else(|| {
                    tracing::debug!(line_item = index, product_id = %item.product_id, "Unknown product");
                    ApiError::not_found("product", item.product_id)
                })?;

            items.push(LineItem {
                product_id: product.id,
                quantity: item.quantity,
                unit_price_at_order: product.unit_price,
            });
        }

        let pharmacy = self
            .pharmacies
            .find_pharmacy(request.pharmacy_id)
            .await?
            .ok_or_else(|| ApiError::not_found("pharmacy", request.pharmacy_id))?;

        let subtotal = PriceCalculator::calculate_subtotal(&items);
        let (discount_percent, discount_source) =
            PriceCalculator::resolve_discount(request.discount, pharmacy.offer.as_ref(), now);
        let total = PriceCalculator::apply_discount(subtotal, discount_percent);
        let (settlement_status, status_label) = PriceCalculator::settlement_for(discount_percent);

        self.metrics.record_order_priced();

        Ok(PricedOrder {
            pharmacy_id: pharmacy.id,
            items,
            subtotal,
            discount_percent,
            discount_source,
            total,
            settlement_status,
            status_label,
        })
    }

    /// Create a new order
    ///
    /// Prices the order (validating everything), then commits: the pharmacy
    /// offer is consumed if it supplied the discount, every line item's
    /// quantity is added to its product's achievement counter, and finally
    /// the order is persisted under the next `ORD-####` number. Nothing is
    /// mutated when validation fails, and no order is stored when a side
    /// effect fails.
    pub async fn create_order(&self, request: CreateOrderRequest) -> ApiResult<Order> {
        let timer = self.metrics.start_order_creation();
        let result = self.create_order_at(&request, Utc::now()).await;
        if result.is_err() {
            timer.cancel();
        }
        result
    }

    async fn create_order_at(&self, request: &CreateOrderRequest, now: DateTime<Utc>) -> ApiResult<Order> {
        let priced = self.price_order(request, now).await?;

        if priced.discount_source == DiscountSource::PharmacyOffer {
            let remaining = self
                .pharmacies
                .consume_offer(priced.pharmacy_id)
                .await?
                .map(|offer| offer.remaining_duration_units);
            self.metrics.record_offer_consumed();
            tracing::debug!(pharmacy_id = %priced.pharmacy_id, ?remaining, "Pharmacy offer consumed");
        }

        let increments: Vec<(Uuid, i32)> = priced
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        self.accumulator.increment_all(&increments).await?;

        // Persisted last: a failed side effect leaves no stored order behind
        let order = {
            let _guard = self.allocation_lock.lock().await;
            let sequence = self.orders.next_order_sequence_number().await?;
            let order = Order {
                id: Uuid::new_v4(),
                order_number: format_order_number(sequence),
                pharmacy_id: priced.pharmacy_id,
                items: priced.items,
                subtotal: priced.subtotal,
                discount_percent: priced.discount_percent,
                total: priced.total,
                settlement_status: priced.settlement_status,
                status_label: priced.status_label,
                created_at: now,
            };
            self.orders.save(order).await?
        };

        tracing::info!(
            order_number = %order.order_number,
            pharmacy_id = %order.pharmacy_id,
            total = %order.total,
            discount = %order.discount_percent,
            discount_source = ?priced.discount_source,
            "Order created"
        );

        Ok(order)
    }

    /// Approve an order and overwrite its pharmacy's discount offer
    ///
    /// # Validation
    /// - `order_id`, `duration` and `discount` are all required; an explicit
    ///   discount of 0 is valid
    /// - The order and its pharmacy must exist
    ///
    /// The order's total and status label are recomputed from its stored
    /// subtotal and the new discount. The pharmacy's offer is replaced with
    /// `{ discount, duration, now + duration months }`.
    pub async fn accept_order(&self, request: AcceptOrderRequest) -> ApiResult<AcceptedOrder> {
        self.accept_order_at(request, Utc::now()).await
    }

    pub async fn accept_order_at(
        &self,
        request: AcceptOrderRequest,
        now: DateTime<Utc>,
    ) -> ApiResult<AcceptedOrder> {
        let order_number = request
            .order_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::validation("order_id is required"))?;
        let duration = request
            .duration
            .ok_or_else(|| ApiError::validation("duration is required"))?;
        let discount = request
            .discount
            .ok_or_else(|| ApiError::validation("discount is required"))?;

        if duration < 0 {
            return Err(ApiError::validation(format!(
                "duration must not be negative, got {}",
                duration
            )));
        }
        validate_percent(discount, "discount")?;
        let offer = DiscountOffer::accepted(discount, duration, now)?;

        let order = self
            .orders
            .find_by_number(&order_number)
            .await?
            .ok_or_else(|| ApiError::not_found("order", &order_number))?;

        if self.pharmacies.find_pharmacy(order.pharmacy_id).await?.is_none() {
            return Err(ApiError::not_found("pharmacy", order.pharmacy_id));
        }

        let status_label = if discount > Decimal::ZERO {
            StatusLabel::DiscountApplied
        } else {
            StatusLabel::Normal
        };
        let update = SettlementUpdate {
            discount_percent: discount,
            total: PriceCalculator::apply_discount(order.subtotal, discount),
            settlement_status: true,
            status_label,
        };
        let order = self.orders.update_settlement(&order_number, update).await?;

        let pharmacy = self.pharmacies.replace_offer(order.pharmacy_id, offer).await?;

        self.metrics.record_order_accepted();
        tracing::info!(
            order_number = %order.order_number,
            pharmacy_id = %pharmacy.id,
            %discount,
            duration,
            "Order accepted, pharmacy offer replaced"
        );

        Ok(AcceptedOrder { order, pharmacy })
    }

    /// Get a specific order by its display number
    pub async fn get_order(&self, order_number: &str) -> ApiResult<Order> {
        self.orders
            .find_by_number(order_number)
            .await?
            .ok_or_else(|| ApiError::not_found("order", order_number))
    }

    /// Orders matching the filter, newest first
    pub async fn list_orders(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>> {
        self.orders.find_all(filter).await
    }

    /// Delete an order
    ///
    /// Achievement counters are NOT decremented: they reflect gross ordered
    /// quantity at creation time.
    pub async fn delete_order(&self, order_number: &str) -> ApiResult<()> {
        self.orders.delete(order_number).await?;
        tracing::info!(%order_number, "Order deleted");
        Ok(())
    }
}

fn validate_percent(percent: Decimal, field: &str) -> ApiResult<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ApiError::validation(format!(
            "{} must be between 0 and 100, got {}",
            field, percent
        )));
    }
    Ok(())
}
