use mr_orders::config::AppConfig;
use mr_orders::{create_router, db, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Field sales orders API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    let state = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url, config.db_max_connections)
                .await
                .expect("Failed to create database pool");
            db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            AppState::postgres(pool, &config)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            AppState::in_memory(&config)
        }
    };

    tracing::info!(
        trend_year = config.trend_year,
        target_summation = ?config.target_summation,
        "Configuration loaded"
    );

    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Orders API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
