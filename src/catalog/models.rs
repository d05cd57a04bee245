use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A catalog product with its running achievement counter
///
/// `cumulative_achievement` only ever grows, except through an explicit
/// administrative reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "PCM-500")]
    pub sku: String,
    #[schema(example = "Paracetamol 500mg")]
    pub name: String,
    pub unit_price: Decimal,
    pub cumulative_achievement: i64,
    /// Period goal the achievement is measured against
    pub target: i64,
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, unit_price: Decimal, target: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            name: name.into(),
            unit_price,
            cumulative_achievement: 0,
            target,
        }
    }
}
