use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::instrument;

use super::{
    dto::{CreateUserInput, CreatedUser, SetPasswordRequest, UpdateUserInput, UserQuery},
    model::PublicUser,
};
use crate::{
    auth::extractors::{AdminUser, AuthUser, SelfOrAdmin},
    error::AppResult,
    response::ApiResponse,
    state::AppState,
    students::model::CreateStudentRequest,
    validation::{UserIdPath, ValidatedJson, ValidatedQuery},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/create-student", post(create_student))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/password", post(change_password))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    ValidatedQuery(query): ValidatedQuery<UserQuery>,
) -> AppResult<ApiResponse<Vec<PublicUser>>> {
    let (users, total) = state.users.list_users(query.into()).await?;
    Ok(ApiResponse::ok("Users fetched successfully", users).with_meta(json!({ "total": total })))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    UserIdPath(id): UserIdPath,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = state.users.get_user(id).await?;
    Ok(ApiResponse::ok("User fetched successfully", user))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidatedJson(payload): ValidatedJson<CreateUserInput>,
) -> AppResult<(StatusCode, ApiResponse<CreatedUser>)> {
    let created = state.users.create_user(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User created successfully", created),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    UserIdPath(id): UserIdPath,
    ValidatedJson(payload): ValidatedJson<UpdateUserInput>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = state.users.update_user(id, payload).await?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    UserIdPath(id): UserIdPath,
) -> AppResult<impl IntoResponse> {
    state.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    access: SelfOrAdmin,
    ValidatedJson(payload): ValidatedJson<SetPasswordRequest>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = state
        .users
        .set_password(access.target, &payload.password)
        .await?;
    Ok(ApiResponse::ok("Password updated successfully", user))
}

#[instrument(skip(state, payload))]
pub async fn create_student(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateStudentRequest>,
) -> AppResult<impl IntoResponse> {
    let student = state.users.create_student_into_db(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Student created successfully", student),
    ))
}
