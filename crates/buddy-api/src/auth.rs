use std::sync::Arc;

use anyhow::anyhow;
use axum::{extract::State, response::IntoResponse};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
    typed_header::TypedHeaderRejection,
};
use tracing::info;

use buddy_crypto::Credentials;
use buddy_db::Database;
use buddy_types::api::{TokenMeta, TokenResponse};

use crate::config::Config;
use crate::error::{ApiError, ApiResult, AuthFailure, JsonApi};
use crate::mailer::Mailer;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: Config,
    pub credentials: Credentials,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
}

impl AppStateInner {
    pub fn new(db: Database, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            credentials: Credentials::new(config.credentials),
            tokens: TokenService::new(&config.token),
            db,
            config,
            mailer,
        }
    }
}

/// `GET /auth/token`
pub async fn issue_token(
    State(state): State<AppState>,
    basic: Result<TypedHeader<Authorization<Basic>>, TypedHeaderRejection>,
) -> ApiResult<impl IntoResponse> {
    token_response(state, basic, false).await
}

/// `GET /auth/token/admin`
pub async fn issue_admin_token(
    State(state): State<AppState>,
    basic: Result<TypedHeader<Authorization<Basic>>, TypedHeaderRejection>,
) -> ApiResult<impl IntoResponse> {
    token_response(state, basic, true).await
}

async fn token_response(
    state: AppState,
    basic: Result<TypedHeader<Authorization<Basic>>, TypedHeaderRejection>,
    want_admin: bool,
) -> ApiResult<JsonApi<TokenResponse>> {
    let TypedHeader(Authorization(basic)) =
        basic.map_err(|_| ApiError::Unauthorized(AuthFailure::InvalidHeader))?;
    let username = basic.username().to_string();
    let password = basic.password().to_string();

    // Password comparison is CPU-bound; keep it off the async runtime.
    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || {
        let user = db
            .db
            .read_user(&username)?
            .ok_or(ApiError::Unauthorized(AuthFailure::InvalidCredentials))?;

        let matches = db
            .credentials
            .compare(&password, &user.password)
            .map_err(ApiError::Internal)?;
        if !matches {
            return Err(ApiError::Unauthorized(AuthFailure::InvalidCredentials));
        }
        Ok::<_, ApiError>(user)
    })
    .await??;

    if want_admin {
        if !user.admin {
            return Err(ApiError::Unauthorized(AuthFailure::NotAdmin));
        }
        if user.email.is_none() {
            return Err(ApiError::Unauthorized(AuthFailure::NotVerified));
        }
    }

    let token = state
        .tokens
        .issue(&user, want_admin)
        .map_err(|e| ApiError::Internal(anyhow!(e)))?;

    if want_admin {
        info!("Issued admin token for {}", user.username);
    }

    Ok(JsonApi(TokenResponse {
        meta: TokenMeta { token },
    }))
}
