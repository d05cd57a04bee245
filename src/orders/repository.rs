use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::orders::order_number::next_sequence;
use crate::orders::{LineItem, Order, OrderFilter, OrderItemRow, OrderRow, StatusLabel};

/// Settlement fields overwritten by the accept-order action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementUpdate {
    pub discount_percent: Decimal,
    pub total: Decimal,
    pub settlement_status: bool,
    pub status_label: StatusLabel,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Highest existing `ORD-####` suffix plus one
    async fn next_order_sequence_number(&self) -> ApiResult<u32>;

    async fn save(&self, order: Order) -> ApiResult<Order>;

    async fn find_by_number(&self, order_number: &str) -> ApiResult<Option<Order>>;

    /// Orders matching `filter`, newest first
    async fn find_all(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>>;

    async fn update_settlement(&self, order_number: &str, update: SettlementUpdate) -> ApiResult<Order>;

    async fn delete(&self, order_number: &str) -> ApiResult<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn next_order_sequence_number(&self) -> ApiResult<u32> {
        let orders = self.orders.read().await;
        next_sequence(orders.keys().map(String::as_str)).ok_or_else(sequence_exhausted)
    }

    async fn save(&self, order: Order) -> ApiResult<Order> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_number) {
            return Err(ApiError::PersistenceError(format!(
                "duplicate order number {}",
                order.order_number
            )));
        }
        orders.insert(order.order_number.clone(), order.clone());
        Ok(order)
    }

    async fn find_by_number(&self, order_number: &str) -> ApiResult<Option<Order>> {
        Ok(self.orders.read().await.get(order_number).cloned())
    }

    async fn find_all(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_settlement(&self, order_number: &str, update: SettlementUpdate) -> ApiResult<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_number)
            .ok_or_else(|| ApiError::not_found("order", order_number))?;

        order.discount_percent = update.discount_percent;
        order.total = update.total;
        order.settlement_status = update.settlement_status;
        order.status_label = update.status_label;
        Ok(order.clone())
    }

    async fn delete(&self, order_number: &str) -> ApiResult<()> {
        self.orders
            .write()
            .await
            .remove(order_number)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("order", order_number))
    }
}

fn sequence_exhausted() -> ApiError {
    ApiError::PersistenceError("order sequence exhausted".to_string())
}

/// Orders backed by the `orders` and `order_items` tables
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach line items to a batch of order rows
    async fn hydrate(&self, rows: Vec<OrderRow>) -> ApiResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT order_id, product_id, quantity, unit_price_at_order
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for row in item_rows {
            items_by_order.entry(row.order_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items).map_err(ApiError::PersistenceError)
            })
            .collect()
    }
}

const ORDER_COLUMNS: &str =
    "id, order_number, pharmacy_id, subtotal, discount_percent, total, settlement_status, status_label, created_at";

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn next_order_sequence_number(&self) -> ApiResult<u32> {
        let highest: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(CAST(SUBSTRING(order_number FROM 5) AS BIGINT))
            FROM orders
            WHERE order_number ~ '^ORD-[0-9]+$'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let highest = u32::try_from(highest.unwrap_or(0))
            .map_err(|_| ApiError::PersistenceError("order sequence out of range".to_string()))?;
        highest.checked_add(1).ok_or_else(sequence_exhausted)
    }

    async fn save(&self, order: Order) -> ApiResult<Order> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.pharmacy_id)
        .bind(order.subtotal)
        .bind(order.discount_percent)
        .bind(order.total)
        .bind(order.settlement_status)
        .bind(order.status_label.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, quantity, unit_price_at_order)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id)
            .bind(position as i32)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_at_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn find_by_number(&self, order_number: &str) -> ApiResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_all(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::uuid IS NULL OR pharmacy_id = $1)
              AND ($2::boolean IS NULL OR settlement_status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(filter.pharmacy_id)
        .bind(filter.settled)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn update_settlement(&self, order_number: &str, update: SettlementUpdate) -> ApiResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET discount_percent = $1, total = $2, settlement_status = $3, status_label = $4
            WHERE order_number = $5
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(update.discount_percent)
        .bind(update.total)
        .bind(update.settlement_status)
        .bind(update.status_label.as_str())
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("order", order_number))?;

        self.hydrate(vec![row])
            .await?
            .pop()
            .ok_or_else(|| ApiError::not_found("order", order_number))
    }

    async fn delete(&self, order_number: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE order_number = $1")
            .bind(order_number)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("order", order_number));
        }
        Ok(())
    }
}
