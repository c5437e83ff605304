use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AnonymousRequest, AuthResponse, LoginRequest, MeResponse, MeUser, PublicUser},
    extractors::AuthUser,
    services,
};
use crate::{error::AppError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/anonymous", post(anonymous))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn anonymous(
    State(state): State<AppState>,
    payload: Result<Json<AnonymousRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let Json(payload) = payload.map_err(AppError::from)?;
    let (user, token) = services::register_anonymous(&state, &payload.city).await?;
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let Json(payload) = payload.map_err(AppError::from)?;
    let (user, token) = services::login(&state, &payload.email, &payload.password).await?;
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: MeUser {
            id: user.id,
            role: user.role,
            city: user.city,
            rating: user.rating,
            banned: user.banned,
        },
    })
}
