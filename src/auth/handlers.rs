use axum::{extract::State, routing::post, Router};
use tracing::instrument;

use crate::{
    auth::dto::{LoginRequest, LoginResponse},
    error::AppResult,
    response::ApiResponse,
    state::AppState,
    validation::ValidatedJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest {
        email,
        password,
        role,
    } = payload;
    let result = state.users.login(&email, &password, role).await?;
    Ok(ApiResponse::ok("Logged in successfully", result))
}
