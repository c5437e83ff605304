use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Role;

/// JWT payload. `role` and `city` are informational for the client; the
/// server always re-reads the user record before trusting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub role: Role,
    pub city: String,
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}
