// HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::error::ApiError;
use crate::orders::{
    AcceptOrderRequest, AcceptedOrder, CreateOrderRequest, CreateOrderResponse, Order, OrderFilter,
};

/// Handler for POST /api/orders
/// Prices and persists a new order
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Invalid order", body = ErrorResponse),
        (status = 404, description = "Unknown pharmacy or product", body = ErrorResponse),
        (status = 500, description = "Persistence failure", body = ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    request.validate()?;

    let order = state.order_service.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(CreateOrderResponse::from(&order))))
}

/// Handler for GET /api/orders
/// Lists orders, newest first
#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderFilter),
    responses(
        (status = 200, description = "Matching orders", body = Vec<Order>)
    ),
    tag = "orders"
)]
pub async fn list_orders_handler(
    State(state): State<crate::AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state.order_service.list_orders(&filter).await?;
    tracing::debug!("Retrieved {} orders", orders.len());
    Ok(Json(orders))
}

/// Handler for GET /api/orders/:order_id
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = String, Path, description = "Display order id, e.g. ORD-0001")),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state.order_service.get_order(&order_id).await?;
    Ok(Json(order))
}

/// Handler for DELETE /api/orders/:order_id
/// Achievement counters are left untouched
#[utoipa::path(
    delete,
    path = "/api/orders/{order_id}",
    params(("order_id" = String, Path, description = "Display order id, e.g. ORD-0001")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn delete_order_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.order_service.delete_order(&order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/orders/accept
/// Approves an order and replaces its pharmacy's discount offer
#[utoipa::path(
    post,
    path = "/api/orders/accept",
    request_body = AcceptOrderRequest,
    responses(
        (status = 200, description = "Order accepted", body = AcceptedOrder),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse),
        (status = 404, description = "Order or pharmacy not found", body = ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn accept_order_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<AcceptOrderRequest>,
) -> Result<Json<AcceptedOrder>, ApiError> {
    let accepted = state.order_service.accept_order(request).await?;
    Ok(Json(accepted))
}
