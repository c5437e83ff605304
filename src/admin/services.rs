use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{AdminUserView, OverviewResponse};
use crate::{
    auth::repo_types::{Role, User, UNSET_CITY},
    error::{AppError, AppResult},
    state::AppState,
};

/// Number of users and reports shown in the admin overview.
pub const OVERVIEW_LIMIT: i64 = 200;

fn require_staff(caller: &User) -> AppResult<()> {
    if caller.role.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden("moderator or owner role required"))
    }
}

fn require_owner(caller: &User) -> AppResult<()> {
    if caller.role == Role::Owner {
        Ok(())
    } else {
        Err(AppError::Forbidden("owner role required"))
    }
}

async fn load_target(state: &AppState, id: Uuid) -> AppResult<User> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or(AppError::NotFound("user"))
}

#[instrument(skip_all, fields(caller = %caller.id))]
pub async fn overview(state: &AppState, caller: &User) -> AppResult<OverviewResponse> {
    require_staff(caller)?;
    let users = state.store.list_users(OVERVIEW_LIMIT).await?;
    let reports = state.store.list_latest_reports(OVERVIEW_LIMIT).await?;
    Ok(OverviewResponse {
        users: users.into_iter().map(AdminUserView::from).collect(),
        reports,
    })
}

/// Hard-deletes a report. A live author loses exactly one rating point no
/// matter how many confirmations the report had collected.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn delete_report(state: &AppState, caller: &User, report_id: Uuid) -> AppResult<()> {
    require_staff(caller)?;
    let deleted = state
        .store
        .delete_report(report_id)
        .await?
        .ok_or(AppError::NotFound("report"))?;
    info!(%report_id, author_id = ?deleted.author_id, "report deleted by staff");
    Ok(())
}

#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn set_banned(
    state: &AppState,
    caller: &User,
    target_id: Uuid,
    banned: bool,
) -> AppResult<()> {
    require_staff(caller)?;
    let target = load_target(state, target_id).await?;
    if target.role == Role::Owner {
        warn!(%target_id, "attempt to ban the owner");
        return Err(AppError::Forbidden("the owner cannot be banned"));
    }
    if !state.store.set_banned(target_id, banned).await? {
        return Err(AppError::NotFound("user"));
    }
    info!(%target_id, banned, "ban flag updated");
    Ok(())
}

#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn set_role(state: &AppState, caller: &User, target_id: Uuid, role: &str) -> AppResult<()> {
    require_owner(caller)?;
    let role: Role = role.trim().parse().map_err(AppError::Validation)?;
    if role == Role::Owner {
        return Err(AppError::validation("role must be moderator or user"));
    }
    let target = load_target(state, target_id).await?;
    if target.role == Role::Owner {
        return Err(AppError::Forbidden("the owner role cannot be changed"));
    }
    if !state.store.set_role(target_id, role).await? {
        return Err(AppError::NotFound("user"));
    }
    info!(%target_id, role = role.as_str(), "role updated");
    Ok(())
}

/// Puts the user's city back to the unset sentinel. Existing reports keep
/// the city they were filed under.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn reset_city(state: &AppState, caller: &User, target_id: Uuid) -> AppResult<()> {
    require_owner(caller)?;
    if !state.store.set_city(target_id, UNSET_CITY).await? {
        return Err(AppError::NotFound("user"));
    }
    info!(%target_id, "city reset");
    Ok(())
}

#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn delete_user(state: &AppState, caller: &User, target_id: Uuid) -> AppResult<()> {
    require_owner(caller)?;
    let target = load_target(state, target_id).await?;
    if target.role == Role::Owner {
        return Err(AppError::Forbidden("the owner account cannot be deleted"));
    }
    if !state.store.delete_user(target_id).await? {
        return Err(AppError::NotFound("user"));
    }
    info!(%target_id, "user deleted");
    Ok(())
}
