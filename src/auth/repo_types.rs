use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// City value assigned by a moderator reset; forces the user to pick again.
pub const UNSET_CITY: &str = "DO_USTALENIA";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Moderator,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Owner | Role::Moderator)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub role: Role,
    #[serde(skip_serializing)]
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // argon2, never exposed
    pub city: String,
    pub rating: i32,
    pub banned: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn has_city(&self) -> bool {
        !self.city.is_empty() && self.city != UNSET_CITY
    }
}

/// Raw `users` row; `role` is stored as text.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub role: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub city: String,
    pub rating: i32,
    pub banned: bool,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = sqlx::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = r
            .role
            .parse::<Role>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(Self {
            id: r.id,
            role,
            email: r.email,
            password_hash: r.password_hash,
            city: r.city,
            rating: r.rating,
            banned: r.banned,
            created_at: r.created_at,
        })
    }
}

/// Fields needed to provision a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub role: Role,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub city: String,
}
