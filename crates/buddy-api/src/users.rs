use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::info;
use validator::Validate;

use buddy_crypto::{VERIFICATION_CODE_LEN, generate_code};
use buddy_db::age_in_years;
use buddy_db::models::{ListedUserRow, NewUserRow};
use buddy_types::api::{
    Document, ListDocument, ListedUserAttributes, NewUser, UserPatch, UserPatchResource,
    UserResource,
};
use buddy_types::models::Role;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, JsonApi};
use crate::extract::{document, expect_type};
use crate::middleware::AuthContext;
use crate::policy;
use crate::query::{parse_page, parse_user_filter};

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `POST /users`: register and mail the verification code.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Document<NewUser>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let user = document(payload)?;
    expect_type("/data/type", &user.kind, "users")?;
    let attributes = user.attributes;

    let birthday = attributes
        .birthday
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ApiError::invalid("/data/attributes/birthday", "invalid birthday"))?
        .and_utc()
        .timestamp_millis();

    let code = generate_code(VERIFICATION_CODE_LEN);
    let email = attributes.email.clone();
    let username = attributes.username.clone();

    // Hashing and the insert run off the async runtime
    let db = state.clone();
    let plain_code = code.clone();
    tokio::task::spawn_blocking(move || {
        let now = now_ms();
        let expire_ms = db.config.email_code_expiration.as_millis() as i64;
        let row = NewUserRow {
            password: db.credentials.hash(&attributes.password)?,
            email_code: db.credentials.hash(&plain_code)?,
            email_code_expire: now + expire_ms,
            username: attributes.username,
            temporary_email: attributes.email,
            role: attributes.role,
            given_name: attributes.given_name,
            family_name: attributes.family_name,
            gender: attributes.gender,
            birthday,
            created: now,
        };
        db.db.create_user(&row)?;
        Ok::<_, ApiError>(())
    })
    .await??;

    state
        .mailer
        .send_verification_email(&email, &username, &code)
        .await?;

    Ok((StatusCode::CREATED, JsonApi(json!({}))))
}

/// `GET /buddies`, visible to comers.
pub async fn list_buddies(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    policy::only_comer(&auth)?;
    list(state, Role::Buddy, params).await
}

/// `GET /comers`, visible to active buddies.
pub async fn list_comers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    policy::only_active_buddy(&auth)?;
    list(state, Role::Comer, params).await
}

async fn list(
    state: AppState,
    role: Role,
    params: HashMap<String, String>,
) -> ApiResult<JsonApi<ListDocument<UserResource>>> {
    let page = parse_page(&params)?;
    let filter = parse_user_filter(&params)?;
    let now = now_ms();

    let rows = tokio::task::spawn_blocking(move || state.db.list_users(role, &filter, page, now))
        .await??;

    Ok(JsonApi(ListDocument {
        data: rows.into_iter().map(|row| listed_user(row, now)).collect(),
    }))
}

fn listed_user(row: ListedUserRow, now: i64) -> UserResource {
    // Only buddies share their family name.
    let family_name = (row.role == Role::Buddy).then_some(row.family_name);
    UserResource {
        kind: "users".to_string(),
        id: row.username,
        attributes: ListedUserAttributes {
            given_name: row.given_name,
            family_name,
            age: age_in_years(row.birthday, now),
            role: row.role,
            gender: row.gender,
            languages: row.languages,
        },
    }
}

/// `PATCH /users/{username}`: the body shape selects `active` (admin) or
/// `available` (the user themself).
pub async fn patch_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    // Authorize on the raw shape so refusals never depend on body validity.
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            policy::only_admin(&auth).or_else(|_| policy::only_logged_me(&auth, &username))?;
            return Err(rejection.into());
        }
    };
    if body.pointer("/data/attributes/active").is_some() {
        policy::only_admin(&auth)?;
    } else {
        policy::only_logged_me(&auth, &username)?;
    }

    let Document { data: patch } = serde_json::from_value::<Document<UserPatchResource>>(body)
        .map_err(|e| ApiError::invalid("/data", e.to_string()))?;
    patch.validate()?;
    expect_type("/data/type", &patch.kind, "users")?;
    if patch.id != username {
        return Err(ApiError::invalid("/data/id", "id must match the username in the url"));
    }

    tokio::task::spawn_blocking(move || match patch.attributes {
        UserPatch::Active(set) => {
            state.db.update_active(&username, set.active)?;
            info!("Set active={} for {}", set.active, username);
            Ok::<_, ApiError>(())
        }
        UserPatch::Available(set) => {
            state.db.update_available(&username, set.available)?;
            Ok(())
        }
    })
    .await??;

    Ok((StatusCode::OK, JsonApi(json!({}))))
}
