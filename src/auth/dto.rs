use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::users::model::{PublicUser, Role};

/// Request body for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password is required"))]
    pub password: String,
    pub role: Role,
}

/// Returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}
