use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use buddy_db::DbError;
use buddy_types::api::{ErrorDocument, ErrorObject, ErrorSource};
use buddy_types::validation::{FieldError, field_errors};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

pub const JSON_API: &str = "application/vnd.api+json";

pub type ApiResult<T> = Result<T, ApiError>;

/// Serializes `T` as the response body with the JSON:API media type.
pub struct JsonApi<T>(pub T);

impl<T: Serialize> IntoResponse for JsonApi<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => ([(header::CONTENT_TYPE, JSON_API)], body).into_response(),
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Why a token request was refused. The message is the response detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// Unknown user or wrong password; the two are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or missing Authorization header")]
    InvalidHeader,

    #[error("email not verified")]
    NotVerified,

    #[error("not admin")]
    NotAdmin,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request")]
    Validation(Vec<FieldError>),

    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("not authorized: {0}")]
    Unauthorized(AuthFailure),

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// A single-field validation failure.
    pub fn invalid(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(pointer, message)])
    }
}

fn not_authorized(detail: Option<String>) -> ErrorDocument {
    ErrorDocument {
        errors: vec![ErrorObject {
            title: "Not Authorized".to_string(),
            detail,
            source: None,
        }],
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, document) = match self {
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                ErrorDocument {
                    errors: fields
                        .into_iter()
                        .map(|f| ErrorObject {
                            title: "Invalid Attribute".to_string(),
                            detail: Some(f.message),
                            source: Some(ErrorSource { pointer: f.pointer }),
                        })
                        .collect(),
                },
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, ErrorDocument { errors: vec![] }),
            ApiError::Conflict => (
                StatusCode::CONFLICT,
                ErrorDocument {
                    errors: vec![ErrorObject {
                        title: "Conflict".to_string(),
                        detail: None,
                        source: None,
                    }],
                },
            ),
            ApiError::Unauthorized(failure) => {
                (StatusCode::UNAUTHORIZED, not_authorized(Some(failure.to_string())))
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, not_authorized(None)),
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, JsonApi(serde_json::json!({})))
                    .into_response();
            }
        };

        (status, JsonApi(document)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => ApiError::NotFound,
            DbError::Conflict => ApiError::Conflict,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(field_errors("/data", &errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid("/data", rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", err);
        ApiError::Internal(err.into())
    }
}
