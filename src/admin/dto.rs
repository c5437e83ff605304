use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};
use crate::reports::repo_types::Report;

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub banned: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    pub role: String,
}

/// User as listed in the admin panel. Credentials are never included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: Uuid,
    pub role: Role,
    pub city: String,
    pub rating: i32,
    pub banned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for AdminUserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            role: u.role,
            city: u.city,
            rating: u.rating,
            banned: u.banned,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub users: Vec<AdminUserView>,
    pub reports: Vec<Report>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
