use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

use super::{claims::CallerContext, gate};
use crate::{error::AppError, state::AppState};

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// Any caller with a valid bearer token.
#[derive(Debug)]
pub struct AuthUser(pub CallerContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = gate::authenticate(authorization(parts), &state.config.jwt)?;
        Ok(AuthUser(caller))
    }
}

/// Authenticated caller whose role is admin.
#[derive(Debug)]
pub struct AdminUser(pub CallerContext);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(caller) = AuthUser::from_request_parts(parts, state).await?;
        gate::require_admin(&caller)?;
        Ok(AdminUser(caller))
    }
}

/// Authenticated caller acting on their own `:id`, or an admin acting on anyone.
#[derive(Debug)]
pub struct SelfOrAdmin {
    pub caller: CallerContext,
    pub target: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for SelfOrAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(caller) = AuthUser::from_request_parts(parts, state).await?;
        let Path(target) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::InvalidIdentifier)?;
        gate::require_self_or_admin(&caller, target)?;
        Ok(SelfOrAdmin { caller, target })
    }
}
