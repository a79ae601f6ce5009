use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use buddy_db::{DbError, VerifyEmailError};
use buddy_types::api::{Document, VerifyEmail};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, JsonApi};
use crate::extract::{document, expect_type};
use crate::users::now_ms;

const CODE_POINTER: &str = "/data/attributes/emailVerificationCode";

/// `PATCH /account`: confirm the email address with the mailed code.
pub async fn verify_email(
    State(state): State<AppState>,
    payload: Result<Json<Document<VerifyEmail>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = document(payload)?;
    expect_type("/data/type", &request.kind, "users")?;

    let username = request.id;
    let code = request.attributes.email_verification_code;

    let db = state.clone();
    let name = username.clone();
    tokio::task::spawn_blocking(move || db.db.verify_email(&db.credentials, &name, &code, now_ms()))
        .await?
        .map_err(verify_error)?;

    info!("Email verified for {}", username);
    Ok((StatusCode::OK, JsonApi(json!({}))))
}

fn verify_error(err: VerifyEmailError) -> ApiError {
    match err {
        // Unknown users look like a wrong code.
        VerifyEmailError::WrongCode | VerifyEmailError::UnknownUser => {
            ApiError::invalid(CODE_POINTER, "code is wrong")
        }
        VerifyEmailError::Expired => ApiError::invalid(CODE_POINTER, "code is expired"),
        VerifyEmailError::AlreadyVerified => ApiError::invalid("/data", "email is already verified"),
        VerifyEmailError::Db(DbError::Conflict) => ApiError::Conflict,
        VerifyEmailError::Db(e) => e.into(),
        VerifyEmailError::Credential(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
    }
}
