use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::model::Role;

/// JWT payload issued at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,       // user ID
    pub role: Role,     // role at login time
    pub email: String,  // lower-cased login email
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
    pub iss: String,    // issuer
    pub aud: String,    // audience
}

/// Identity established by the credential gate and handed to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerContext {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
}

impl CallerContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for CallerContext {
    fn from(c: Claims) -> Self {
        Self {
            id: c.id,
            role: c.role,
            email: c.email,
        }
    }
}
