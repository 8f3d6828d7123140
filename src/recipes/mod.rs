pub mod draft;
mod dto;
pub mod handlers;
pub mod matcher;
pub mod repo_types;
pub mod seed;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
