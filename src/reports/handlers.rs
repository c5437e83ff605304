use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateReportRequest, ListReportsQuery, MessageResponse, ReportListResponse, ReportResponse},
    services,
};
use crate::{
    auth::extractors::{ActiveUser, MaybeUser},
    error::AppError,
    state::AppState,
};

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports).post(create_report))
        .route("/reports/:id/confirm", post(confirm_report))
}

#[instrument(skip_all)]
pub async fn create_report(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    payload: Result<Json<CreateReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReportResponse>), (StatusCode, String)> {
    if !state.report_limiter.check(caller.id).await {
        warn!(user_id = %caller.id, "report rate limit hit");
        return Err(AppError::RateLimited.into());
    }
    let Json(req) = payload.map_err(AppError::from)?;

    let report = services::create_report(&state, &caller, req).await?;
    Ok((StatusCode::CREATED, Json(ReportResponse { report })))
}

#[instrument(skip(state, caller))]
pub async fn list_reports(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    Query(q): Query<ListReportsQuery>,
) -> Result<Json<ReportListResponse>, (StatusCode, String)> {
    let city = q
        .city
        .filter(|c| !c.trim().is_empty())
        .or_else(|| caller.map(|u| u.city))
        .ok_or_else(|| AppError::validation("city is required"))?;
    let window = q
        .since_minutes
        .as_deref()
        .and_then(|m| m.trim().parse::<i64>().ok());

    let reports = services::list_reports(&state, &city, window).await?;
    Ok(Json(ReportListResponse { reports }))
}

#[instrument(skip(state, caller))]
pub async fn confirm_report(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    services::confirm_report(&state, &caller, id).await?;
    Ok(Json(MessageResponse {
        message: "report confirmed",
    }))
}
