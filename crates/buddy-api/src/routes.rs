use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::middleware::authenticate;
use crate::{account, languages, messages, users};

/// The whole HTTP surface. Token routes skip [`authenticate`]; every other
/// handler receives an `AuthContext`.
pub fn router(state: AppState) -> Router {
    let token_routes = Router::new()
        .route("/auth/token", get(auth::issue_token))
        .route("/auth/token/admin", get(auth::issue_admin_token));

    let api_routes = Router::new()
        .route("/users", post(users::register))
        .route("/users/{username}", patch(users::patch_user))
        .route(
            "/users/{username}/languages",
            get(languages::list_user_languages).post(languages::add_user_language),
        )
        .route(
            "/users/{username}/languages/{language}",
            delete(languages::remove_user_language),
        )
        .route("/account", patch(account::verify_email))
        .route("/buddies", get(users::list_buddies))
        .route("/comers", get(users::list_comers))
        .route(
            "/messages",
            get(messages::read_conversation).post(messages::send_message),
        )
        .route("/languages", get(languages::list_languages))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(token_routes)
        .merge(api_routes)
        .fallback(|| async { ApiError::NotFound })
        .with_state(state)
}
