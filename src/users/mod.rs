use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod model;
pub mod repo;
pub mod service;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
