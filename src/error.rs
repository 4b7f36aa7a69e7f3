use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::response::{ApiResponse, FieldIssue};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Validation error")]
    Validation(Vec<FieldIssue>),

    #[error("Invalid identifier")]
    InvalidIdentifier,

    #[error("Server misconfiguration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn unauthorized() -> Self {
        AppError::Unauthorized("Unauthorized".into())
    }

    pub fn invalid_credentials() -> Self {
        AppError::Unauthorized(INVALID_CREDENTIALS.into())
    }

    pub fn user_not_found() -> Self {
        AppError::NotFound("User not found".into())
    }

    pub fn missing_signing_secret() -> Self {
        AppError::Configuration("missing JWT secret".into())
    }

    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldIssue::new(path, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::InvalidIdentifier => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("23505") {
                let field = match db.constraint() {
                    Some(c) if c.contains("email") => "email",
                    Some(c) if c.contains("display_id") => "id",
                    _ => "",
                };
                return if field.is_empty() {
                    AppError::Conflict("Duplicate value".into())
                } else {
                    AppError::Conflict(format!("Duplicate value for: {field}"))
                };
            }
        }
        AppError::Internal(anyhow::Error::new(e).context("database error"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(issues) => ApiResponse::failure("Validation error", issues),
            AppError::Configuration(msg) => {
                error!(error = %msg, "configuration error");
                ApiResponse::failure(format!("Server misconfiguration: {msg}"), vec![])
            }
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                ApiResponse::failure("Internal Server Error", vec![])
            }
            other => ApiResponse::failure(other.to_string(), vec![]),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AppError::unauthorized().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("Forbidden".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::user_not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::validation("a", "b").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidIdentifier.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::missing_signing_secret().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn non_database_sqlx_errors_are_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
