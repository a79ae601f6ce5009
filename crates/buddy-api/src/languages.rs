use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use buddy_types::api::{
    Document, LanguageAttributes, LanguageResource, ListDocument, NewUserLanguage,
    UserLanguageAttributes, UserLanguageResource,
};
use buddy_types::validation::validate_code2;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, JsonApi};
use crate::extract::{document, expect_type};
use crate::middleware::AuthContext;
use crate::policy;

/// `GET /languages`: the catalog users pick from.
pub async fn list_languages(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = tokio::task::spawn_blocking(move || state.db.list_languages()).await??;

    Ok(JsonApi(ListDocument {
        data: rows
            .into_iter()
            .map(|row| LanguageResource {
                kind: "languages".to_string(),
                id: row.code2,
                attributes: LanguageAttributes {
                    name_en: row.name_en,
                    name_cs: row.name_cs,
                    name_original: row.name_original,
                },
            })
            .collect::<Vec<_>>(),
    }))
}

/// `GET /users/{username}/languages`
pub async fn list_user_languages(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    policy::only_logged(&auth)?;

    let rows =
        tokio::task::spawn_blocking(move || state.db.read_user_languages(&username)).await??;

    Ok(JsonApi(ListDocument {
        data: rows
            .into_iter()
            .map(|language| UserLanguageResource {
                kind: "languages".to_string(),
                id: language.code2,
                attributes: UserLanguageAttributes {
                    level: language.level,
                },
            })
            .collect::<Vec<_>>(),
    }))
}

/// `POST /users/{username}/languages`
pub async fn add_user_language(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<Document<NewUserLanguage>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    policy::only_logged_me(&auth, &username)?;

    let request = document(payload)?;
    expect_type("/data/type", &request.kind, "user-languages")?;
    let language = request.relationships.language.data;
    expect_type(
        "/data/relationships/language/data/type",
        &language.kind,
        "languages",
    )?;
    let level = request.attributes.level;

    tokio::task::spawn_blocking(move || {
        state.db.add_user_language(&username, &language.id, level)
    })
    .await??;

    Ok((StatusCode::CREATED, JsonApi(json!({}))))
}

/// `DELETE /users/{username}/languages/{language}`
pub async fn remove_user_language(
    State(state): State<AppState>,
    Path((username, code2)): Path<(String, String)>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    policy::only_logged_me(&auth, &username)?;
    // An invalid code cannot name an existing pairing.
    if validate_code2(&code2).is_err() {
        return Err(ApiError::NotFound);
    }

    tokio::task::spawn_blocking(move || state.db.remove_user_language(&username, &code2))
        .await??;

    Ok(StatusCode::NO_CONTENT)
}
