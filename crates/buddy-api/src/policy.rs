//! Authorization checks over the request's [`AuthContext`].
//!
//! Handlers call these before touching any data. Every refusal is the same
//! 403 so nothing about the target leaks.

use buddy_types::models::Role;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthContext;

fn allow(permitted: bool) -> ApiResult<()> {
    if permitted {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn only_admin(auth: &AuthContext) -> ApiResult<()> {
    allow(auth.admin)
}

pub fn only_active_buddy(auth: &AuthContext) -> ApiResult<()> {
    allow(auth.logged && auth.role == Some(Role::Buddy) && auth.active == Some(true))
}

pub fn only_comer(auth: &AuthContext) -> ApiResult<()> {
    allow(auth.logged && auth.role == Some(Role::Comer))
}

pub fn only_active_buddy_or_comer(auth: &AuthContext) -> ApiResult<()> {
    only_active_buddy(auth).or_else(|_| only_comer(auth))
}

/// The caller is the verified user named in the route.
pub fn only_logged_me(auth: &AuthContext, username: &str) -> ApiResult<()> {
    allow(auth.logged && auth.is(username))
}

/// Any verified user; yields their username.
pub fn only_logged(auth: &AuthContext) -> ApiResult<&str> {
    match auth.username.as_deref() {
        Some(username) if auth.logged => Ok(username),
        _ => Err(ApiError::Forbidden),
    }
}
