pub mod dto;
pub mod guard;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod sweeper;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::report_routes()
}
