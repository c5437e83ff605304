use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Role, User};

/// Request body for an anonymous, city-bound account.
#[derive(Debug, Deserialize)]
pub struct AnonymousRequest {
    #[serde(default)]
    pub city: String,
}

/// Request body for staff login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response returned after anonymous sign-up or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub role: Role,
    pub city: String,
    pub rating: i32,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            role: u.role,
            city: u.city.clone(),
            rating: u.rating,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: MeUser,
}

#[derive(Debug, Serialize)]
pub struct MeUser {
    pub id: Uuid,
    pub role: Role,
    pub city: String,
    pub rating: i32,
    pub banned: bool,
}
