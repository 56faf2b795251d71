pub mod dto;
pub mod handlers;
pub mod repo;

use crate::{auth::jwt::JwtKeys, state::AppState};
use axum::Router;

pub fn router(keys: JwtKeys) -> Router<AppState> {
    Router::new().merge(handlers::item_routes(keys))
}
