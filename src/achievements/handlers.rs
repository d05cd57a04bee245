// HTTP handlers for achievement reporting

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::achievements::MonthlyAchievementRecord;
use crate::error::ApiError;

/// Query parameters for the monthly trend
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TrendQuery {
    /// Year whose twelve months are always present; defaults to the configured year
    pub year: Option<i32>,
}

/// Handler for GET /api/achievements/monthly
#[utoipa::path(
    get,
    path = "/api/achievements/monthly",
    params(TrendQuery),
    responses(
        (status = 200, description = "Monthly trend sorted by month", body = Vec<MonthlyAchievementRecord>),
        (status = 400, description = "Invalid year", body = ErrorResponse)
    ),
    tag = "achievements"
)]
pub async fn monthly_trend_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<MonthlyAchievementRecord>>, ApiError> {
    let trend = state.trend_service.monthly_trend(query.year).await?;
    Ok(Json(trend))
}
