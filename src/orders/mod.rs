pub mod dto;
mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod status;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes().merge(handlers::admin_routes())
}
