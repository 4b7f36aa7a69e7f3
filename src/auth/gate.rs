//! Credential gate: three independent checks that run before any handler logic.
//!
//! `authenticate` turns an `Authorization` header into a [`CallerContext`] using the
//! token alone; `require_admin` and `require_self_or_admin` apply role policy to an
//! already authenticated caller. None of them touch persistence.

use tracing::warn;
use uuid::Uuid;

use super::{claims::CallerContext, jwt::JwtKeys};
use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
};

pub fn authenticate(header: Option<&str>, cfg: &JwtConfig) -> AppResult<CallerContext> {
    // Missing secret is reported before looking at the request at all.
    let keys = JwtKeys::from_config(cfg)?;

    let header = header.ok_or_else(|| {
        warn!("missing Authorization header");
        AppError::unauthorized()
    })?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            warn!("invalid auth scheme");
            AppError::unauthorized()
        })?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::unauthorized()
    })?;

    Ok(claims.into())
}

pub fn require_admin(caller: &CallerContext) -> AppResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        warn!(user_id = %caller.id, role = %caller.role, "admin access required");
        Err(AppError::Forbidden("Forbidden: admin access required".into()))
    }
}

pub fn require_self_or_admin(caller: &CallerContext, target: Uuid) -> AppResult<()> {
    if caller.is_admin() || caller.id == target {
        Ok(())
    } else {
        warn!(user_id = %caller.id, %target, "caller is neither owner nor admin");
        Err(AppError::Forbidden("Forbidden".into()))
    }
}
