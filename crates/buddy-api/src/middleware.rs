use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use buddy_types::api::Claims;
use buddy_types::models::Role;
use tracing::debug;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::token::TokenError;

/// Who is calling. Every request past [`authenticate`] carries one as an
/// extension; requests without a token get the anonymous context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// The caller holds a token of a user with a verified email.
    pub logged: bool,
    pub admin: bool,
    pub username: Option<String>,
    pub role: Option<Role>,
    /// Set for buddies only.
    pub active: Option<bool>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is(&self, username: &str) -> bool {
        self.username.as_deref() == Some(username)
    }
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        let active = match claims.role {
            Role::Buddy => claims.active,
            Role::Comer => None,
        };
        Self {
            logged: claims.verified,
            admin: claims.admin == Some(true),
            username: Some(claims.username),
            role: Some(claims.role),
            active,
        }
    }
}

/// Decode the bearer token, if any, into an [`AuthContext`].
/// A present but invalid token ends the request with 403.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let context = match req.headers().get(header::AUTHORIZATION) {
        None => AuthContext::anonymous(),
        Some(value) => {
            let verified = value
                .to_str()
                .map_err(|_| TokenError::InvalidAuthMethod)
                .and_then(|h| state.tokens.verify(h));
            match verified {
                Ok(claims) => AuthContext::from(claims),
                Err(e) => {
                    debug!("Rejected token: {}", e);
                    return ApiError::Forbidden.into_response();
                }
            }
        }
    };

    req.extensions_mut().insert(context);
    next.run(req).await
}
