// HTTP handlers for catalog administration

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::catalog::Product;
use crate::error::ApiError;

/// Handler for POST /api/products/:id/achievement/reset
/// Explicit administrative reset of a product's achievement counter
#[utoipa::path(
    post,
    path = "/api/products/{id}/achievement/reset",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Counter reset", body = Product),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn reset_achievement_handler(
    State(state): State<crate::AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = state.catalog.reset_achievement(product_id).await?;
    tracing::info!(%product_id, sku = %product.sku, "Achievement counter reset");
    Ok(Json(product))
}
