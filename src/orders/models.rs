use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Display tag derived from the order's discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum StatusLabel {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Discount Applied")]
    DiscountApplied,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Normal => "Normal",
            StatusLabel::DiscountApplied => "Discount Applied",
        }
    }

    /// Parse status label from its display string
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "Normal" => Ok(StatusLabel::Normal),
            "Discount Applied" => Ok(StatusLabel::DiscountApplied),
            _ => Err(format!("Invalid status label: {}", s)),
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which branch of discount resolution produced the order's discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountSource {
    None,
    Explicit,
    PharmacyOffer,
}

/// One product+quantity entry of an order
///
/// `unit_price_at_order` is captured when the order is priced and never
/// re-read from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_at_order: Decimal,
}

/// Persisted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    /// Display id, `ORD-####`
    #[schema(example = "ORD-0001")]
    pub order_number: String,
    pub pharmacy_id: Uuid,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub total: Decimal,
    /// true = finalized/approved, false = awaiting discount approval
    pub settlement_status: bool,
    pub status_label: StatusLabel,
    pub created_at: DateTime<Utc>,
}

/// Result of pricing an order, before anything is persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub pharmacy_id: Uuid,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount_source: DiscountSource,
    pub total: Decimal,
    pub settlement_status: bool,
    pub status_label: StatusLabel,
}

/// Request DTO for one line item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Request DTO for creating a new order
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub pharmacy_id: Uuid,
    #[validate(
        length(min = 1, message = "no line items"),
        custom = "validate_item_quantities"
    )]
    pub items: Vec<OrderItemRequest>,
    /// Explicit discount percent; zero or absent falls through to the pharmacy offer
    #[serde(default)]
    pub discount: Option<Decimal>,
}

/// Every line item must order a positive quantity
fn validate_item_quantities(items: &[OrderItemRequest]) -> Result<(), ValidationError> {
    match items.iter().enumerate().find(|(_, item)| item.quantity <= 0) {
        Some((index, item)) => {
            let mut error = ValidationError::new("quantity");
            error.message = Some(Cow::Owned(format!(
                "line item {}: quantity must be a positive integer, got {}",
                index, item.quantity
            )));
            Err(error)
        }
        None => Ok(()),
    }
}

/// Request DTO for the administrative accept-order action
///
/// All fields are options so a missing field can be told apart from an
/// explicit zero discount.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AcceptOrderRequest {
    pub order_id: Option<String>,
    pub duration: Option<i32>,
    pub discount: Option<Decimal>,
}

/// Outcome of an accept-order action: the settled order and the pharmacy
/// carrying its replaced offer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AcceptedOrder {
    pub order: Order,
    pub pharmacy: crate::pharmacies::Pharmacy,
}

/// Response DTO for a created order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status_label: StatusLabel,
    pub settlement_status: bool,
}

impl From<&Order> for CreateOrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_number.clone(),
            subtotal: order.subtotal,
            discount: order.discount_percent,
            total: order.total,
            status_label: order.status_label,
            settlement_status: order.settlement_status,
        }
    }
}

/// Filter for listing orders
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct OrderFilter {
    pub pharmacy_id: Option<Uuid>,
    /// Filter on settlement status
    pub settled: Option<bool>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.pharmacy_id.map_or(true, |id| order.pharmacy_id == id)
            && self.settled.map_or(true, |settled| order.settlement_status == settled)
    }
}

/// Row shape of the `orders` table
#[derive(Debug, Clone, FromRow)]
pub(crate) struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub pharmacy_id: Uuid,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub total: Decimal,
    pub settlement_status: bool,
    pub status_label: String,
    pub created_at: DateTime<Utc>,
}

/// Row shape of the `order_items` table
#[derive(Debug, Clone, FromRow)]
pub(crate) struct OrderItemRow {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_at_order: Decimal,
}

impl OrderRow {
    pub(crate) fn into_order(self, items: Vec<LineItem>) -> Result<Order, String> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            pharmacy_id: self.pharmacy_id,
            items,
            subtotal: self.subtotal,
            discount_percent: self.discount_percent,
            total: self.total,
            settlement_status: self.settlement_status,
            status_label: StatusLabel::parse(&self.status_label)?,
            created_at: self.created_at,
        })
    }
}

impl From<OrderItemRow> for LineItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price_at_order: row.unit_price_at_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_label_serialization() {
        assert_eq!(serde_json::to_string(&StatusLabel::Normal).unwrap(), "\"Normal\"");
        assert_eq!(
            serde_json::to_string(&StatusLabel::DiscountApplied).unwrap(),
            "\"Discount Applied\""
        );
        assert_eq!(StatusLabel::parse("Discount Applied").unwrap(), StatusLabel::DiscountApplied);
        assert!(StatusLabel::parse("discounted").is_err());
    }

    #[test]
    fn test_create_order_request_deserialization() {
        let json = r#"{
            "pharmacy_id": "6f1c7f64-2a8e-4f5b-9a55-0f7b4c3f2a10",
            "items": [{"product_id": "0b6a43a1-8b61-4d16-b3b5-1f9b1b8f0e01", "quantity": 2}],
            "discount": 10
        }"#;

        let request: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.discount, Some(dec!(10)));
    }

    #[test]
    fn test_create_order_request_without_discount() {
        let json = r#"{
            "pharmacy_id": "6f1c7f64-2a8e-4f5b-9a55-0f7b4c3f2a10",
            "items": []
        }"#;

        let request: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert!(request.discount.is_none());
        let errors = request.validate().unwrap_err();
        assert!(errors.to_string().contains("no line items"));
    }

    #[test]
    fn test_create_order_request_rejects_non_positive_quantity() {
        let request = CreateOrderRequest {
            pharmacy_id: Uuid::new_v4(),
            items: vec![
                OrderItemRequest { product_id: Uuid::new_v4(), quantity: 3 },
                OrderItemRequest { product_id: Uuid::new_v4(), quantity: 0 },
            ],
            discount: None,
        };

        let errors = request.validate().unwrap_err();
        assert!(errors.to_string().contains("line item 1"));
    }

    #[test]
    fn test_accept_request_distinguishes_zero_from_missing() {
        let zero: AcceptOrderRequest =
            serde_json::from_str(r#"{"order_id": "ORD-0001", "duration": 2, "discount": 0}"#).unwrap();
        assert_eq!(zero.discount, Some(Decimal::ZERO));

        let missing: AcceptOrderRequest =
            serde_json::from_str(r#"{"order_id": "ORD-0001", "duration": 2}"#).unwrap();
        assert!(missing.discount.is_none());
    }

    #[test]
    fn test_order_filter_matches() {
        let pharmacy_id = Uuid::new_v4();
        let order = Order {
            id: Uuid::new_v4(),
            order_number: "ORD-0001".to_string(),
            pharmacy_id,
            items: vec![],
            subtotal: dec!(100),
            discount_percent: Decimal::ZERO,
            total: dec!(100),
            settlement_status: true,
            status_label: StatusLabel::Normal,
            created_at: Utc::now(),
        };

        assert!(OrderFilter::default().matches(&order));
        assert!(OrderFilter { pharmacy_id: Some(pharmacy_id), settled: Some(true) }.matches(&order));
        assert!(!OrderFilter { pharmacy_id: None, settled: Some(false) }.matches(&order));
        assert!(!OrderFilter { pharmacy_id: Some(Uuid::new_v4()), settled: None }.matches(&order));
    }
}
