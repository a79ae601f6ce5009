use axum::Json;
use axum::extract::rejection::JsonRejection;
use buddy_types::api::Document;
use validator::Validate;

use crate::error::{ApiError, ApiResult};

/// Unwrap `{ "data": ... }` and run field validation on `data`.
pub fn document<T: Validate>(payload: Result<Json<Document<T>>, JsonRejection>) -> ApiResult<T> {
    let Json(Document { data }) = payload?;
    data.validate()?;
    Ok(data)
}

/// Resource objects must name their type.
pub fn expect_type(pointer: &str, kind: &str, expected: &str) -> ApiResult<()> {
    if kind == expected {
        Ok(())
    } else {
        Err(ApiError::invalid(pointer, format!("type must be {expected}")))
    }
}
