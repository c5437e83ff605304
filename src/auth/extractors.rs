use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::warn;

use super::{jwt::JwtKeys, repo_types::User};
use crate::{error::AppError, state::AppState};

/// Authenticated caller, re-loaded from the store on every request.
pub struct AuthUser(pub User);

/// Authenticated caller allowed to mutate state (not banned).
pub struct ActiveUser(pub User);

/// Caller if a valid token was presented; anonymous otherwise.
pub struct MaybeUser(pub Option<User>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

async fn resolve(state: &AppState, token: &str) -> Result<User, AppError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        AppError::Unauthorized("invalid or expired token".into())
    })?;

    state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user no longer exists".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or((
            StatusCode::UNAUTHORIZED,
            "missing or invalid Authorization header".to_string(),
        ))?;
        Ok(AuthUser(resolve(state, token).await?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.banned {
            warn!(user_id = %user.id, "banned user attempted a mutation");
            return Err(AppError::Forbidden("account banned").into());
        }
        Ok(ActiveUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeUser(None));
        };
        match resolve(state, token).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized(_)) => Ok(MaybeUser(None)),
            Err(e) => Err(e.into()),
        }
    }
}
