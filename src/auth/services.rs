use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo_types::{NewUser, Role, User},
};
use crate::{
    clock::Clock,
    config::OwnerConfig,
    error::{AppError, AppResult},
    state::AppState,
    store::ReportStore,
};

/// City given to the bootstrapped owner account.
const OWNER_HOME_CITY: &str = "Warszawa";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn issue_token(state: &AppState, user: &User) -> AppResult<String> {
    JwtKeys::from_ref(state)
        .sign(user)
        .map_err(|e| AppError::Internal(format!("jwt sign failed: {e}")))
}

/// Creates a plain `user` account bound to `city` and signs a token for it.
#[instrument(skip(state))]
pub async fn register_anonymous(state: &AppState, city: &str) -> AppResult<(User, String)> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::validation("city is required"));
    }

    let user = state
        .store
        .create_user(
            NewUser {
                role: Role::User,
                email: None,
                password_hash: None,
                city: city.to_string(),
            },
            state.clock.now(),
        )
        .await?;

    let token = issue_token(state, &user)?;
    info!(user_id = %user.id, city = %user.city, "anonymous user created");
    Ok((user, token))
}

#[instrument(skip(state, password))]
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<(User, String)> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::validation("email and password are required"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("invalid email"));
    }

    let invalid = || AppError::Unauthorized("invalid credentials".into());

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(invalid());
    };
    let ok = verify_password(password, hash).map_err(|e| AppError::Internal(e.to_string()))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }
    if user.banned {
        warn!(user_id = %user.id, "banned user attempted login");
        return Err(AppError::Forbidden("account banned"));
    }

    let token = issue_token(state, &user)?;
    info!(user_id = %user.id, role = ?user.role, "user logged in");
    Ok((user, token))
}

/// Enforces the single-owner invariant at startup, creating the owner from
/// configuration when none exists yet.
pub async fn bootstrap_owner(
    store: &dyn ReportStore,
    clock: &dyn Clock,
    owner: Option<&OwnerConfig>,
) -> anyhow::Result<()> {
    let owners = store.count_owners().await?;
    if owners > 1 {
        anyhow::bail!("found {owners} owner accounts; exactly one is allowed");
    }
    if owners == 1 {
        return Ok(());
    }

    let Some(owner) = owner else {
        warn!("OWNER_EMAIL and OWNER_PASSWORD are not set; the admin panel is unavailable until they are configured");
        return Ok(());
    };

    let email = owner.email.trim().to_lowercase();
    anyhow::ensure!(is_valid_email(&email), "OWNER_EMAIL is not a valid email");

    let user = store
        .create_user(
            NewUser {
                role: Role::Owner,
                email: Some(email),
                password_hash: Some(hash_password(&owner.password)?),
                city: OWNER_HOME_CITY.to_string(),
            },
            clock.now(),
        )
        .await?;
    info!(user_id = %user.id, "owner account created from OWNER_EMAIL/OWNER_PASSWORD");
    Ok(())
}
