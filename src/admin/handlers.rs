use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{BanRequest, OkResponse, OverviewResponse, RoleRequest},
    services,
};
use crate::{auth::extractors::ActiveUser, error::AppError, state::AppState};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/overview", get(overview))
        .route("/admin/reports/:id", delete(delete_report))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/users/:id/ban", post(set_banned))
        .route("/admin/users/:id/role", post(set_role))
        .route("/admin/users/:id/reset-city", post(reset_city))
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn ok() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

#[instrument(skip_all)]
pub async fn overview(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
) -> ApiResult<OverviewResponse> {
    Ok(Json(services::overview(&state, &caller).await?))
}

#[instrument(skip(state, caller))]
pub async fn delete_report(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OkResponse> {
    services::delete_report(&state, &caller, id).await?;
    Ok(ok())
}

#[instrument(skip(state, caller, payload))]
pub async fn set_banned(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<BanRequest>, JsonRejection>,
) -> ApiResult<OkResponse> {
    let Json(payload) = payload.map_err(AppError::from)?;
    let banned = payload
        .banned
        .ok_or_else(|| AppError::validation("banned is required"))?;
    services::set_banned(&state, &caller, id, banned).await?;
    Ok(ok())
}

#[instrument(skip(state, caller, payload))]
pub async fn set_role(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> ApiResult<OkResponse> {
    let Json(payload) = payload.map_err(AppError::from)?;
    services::set_role(&state, &caller, id, &payload.role).await?;
    Ok(ok())
}

#[instrument(skip(state, caller))]
pub async fn reset_city(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OkResponse> {
    services::reset_city(&state, &caller, id).await?;
    Ok(ok())
}

#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OkResponse> {
    services::delete_user(&state, &caller, id).await?;
    Ok(ok())
}
