//! Order pricing and achievement aggregation for pharma field sales
//!
//! Medical representatives place orders on behalf of pharmacies. Every order
//! is priced from the catalog, discounted explicitly or through the pharmacy's
//! standing offer, tagged with a settlement status, and counted towards each
//! product's sales target. The monthly trend reports achievement against
//! target month by month.

pub mod achievements;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod orders;
pub mod pharmacies;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use achievements::TrendService;
use catalog::{AchievementAccumulator, CatalogAccumulator, CatalogStore, InMemoryCatalogStore, PgCatalogStore};
use config::AppConfig;
use metrics::{EngineMetrics, MetricsSnapshot};
use orders::{InMemoryOrderStore, OrderService, OrderStore, PgOrderStore};
use pharmacies::{InMemoryPharmacyStore, PgPharmacyStore, PharmacyStore};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        orders::handlers::create_order_handler,
        orders::handlers::list_orders_handler,
        orders::handlers::get_order_handler,
        orders::handlers::delete_order_handler,
        orders::handlers::accept_order_handler,
        achievements::handlers::monthly_trend_handler,
        catalog::handlers::reset_achievement_handler,
        metrics_handler,
    ),
    components(
        schemas(
            orders::Order,
            orders::LineItem,
            orders::StatusLabel,
            orders::OrderItemRequest,
            orders::CreateOrderRequest,
            orders::CreateOrderResponse,
            orders::AcceptOrderRequest,
            orders::AcceptedOrder,
            pharmacies::Pharmacy,
            pharmacies::DiscountOffer,
            catalog::Product,
            achievements::MonthlyAchievementRecord,
            MetricsSnapshot,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "orders", description = "Order pricing and lifecycle"),
        (name = "achievements", description = "Achievement-vs-target reporting"),
        (name = "products", description = "Catalog administration"),
        (name = "metrics", description = "Engine metrics")
    ),
    info(
        title = "Field Sales Orders API",
        version = "0.1.0",
        description = "Order pricing, pharmacy discount offers and monthly achievement trend"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub pharmacies: Arc<dyn PharmacyStore>,
    pub order_service: OrderService,
    pub trend_service: TrendService,
    pub metrics: EngineMetrics,
}

impl AppState {
    /// Wire services over the given stores
    pub fn from_stores(
        catalog: Arc<dyn CatalogStore>,
        pharmacies: Arc<dyn PharmacyStore>,
        orders: Arc<dyn OrderStore>,
        config: &AppConfig,
    ) -> Self {
        let metrics = EngineMetrics::new();
        let accumulator: Arc<dyn AchievementAccumulator> = Arc::new(CatalogAccumulator::new(catalog.clone()));

        let order_service = OrderService::with_metrics(
            catalog.clone(),
            pharmacies.clone(),
            orders.clone(),
            accumulator,
            metrics.clone(),
        );
        let trend_service = TrendService::new(
            orders,
            catalog.clone(),
            config.trend_year,
            config.target_summation,
            metrics.clone(),
        );

        Self {
            catalog,
            pharmacies,
            order_service,
            trend_service,
            metrics,
        }
    }

    /// State backed by empty in-memory stores
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::from_stores(
            Arc::new(InMemoryCatalogStore::new()),
            Arc::new(InMemoryPharmacyStore::new()),
            Arc::new(InMemoryOrderStore::new()),
            config,
        )
    }

    /// State backed by PostgreSQL
    pub fn postgres(pool: PgPool, config: &AppConfig) -> Self {
        Self::from_stores(
            Arc::new(PgCatalogStore::new(pool.clone())),
            Arc::new(PgPharmacyStore::new(pool.clone())),
            Arc::new(PgOrderStore::new(pool)),
            config,
        )
    }
}

/// Handler for GET /api/metrics
#[utoipa::path(
    get,
    path = "/api/metrics",
    responses(
        (status = 200, description = "Engine metrics snapshot", body = MetricsSnapshot)
    ),
    tag = "metrics"
)]
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/api/orders",
            post(orders::create_order_handler).get(orders::list_orders_handler),
        )
        .route("/api/orders/accept", post(orders::accept_order_handler))
        .route(
            "/api/orders/:order_id",
            get(orders::get_order_handler).delete(orders::delete_order_handler),
        )
        .route("/api/achievements/monthly", get(achievements::monthly_trend_handler))
        .route(
            "/api/products/:id/achievement/reset",
            post(catalog::reset_achievement_handler),
        )
        .route("/api/metrics", get(metrics_handler))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}
