use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use buddy_db::models::MessageRow;
use buddy_types::api::{
    Document, ListDocument, MessageAttributes, MessageRelationships, MessageResource, NewMessage,
    UserRef,
};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, JsonApi};
use crate::extract::{document, expect_type};
use crate::middleware::AuthContext;
use crate::policy;
use crate::query::parse_with;
use crate::users::now_ms;

const RECEIVER_POINTER: &str = "/data/relationships/receiver/data/id";

/// `POST /messages`: an active buddy writes to a comer or the other way round.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<Document<NewMessage>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    policy::only_active_buddy_or_comer(&auth)?;
    let sender = policy::only_logged(&auth)?.to_string();

    let message = document(payload)?;
    expect_type("/data/type", &message.kind, "messages")?;
    let receiver = message.relationships.receiver.data;
    expect_type(
        "/data/relationships/receiver/data/type",
        &receiver.kind,
        "users",
    )?;
    if receiver.id == sender {
        return Err(ApiError::invalid(RECEIVER_POINTER, "receiver must differ from sender"));
    }
    let body = message.attributes.body.trim().to_string();

    // Pairing rules are enforced by the insert itself
    tokio::task::spawn_blocking(move || {
        state.db.send_message(&sender, &receiver.id, &body, now_ms())
    })
    .await??;

    Ok((StatusCode::CREATED, JsonApi(json!({}))))
}

/// `GET /messages?filter[with]=<username>`: the conversation, newest first.
pub async fn read_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let me = policy::only_logged(&auth)?.to_string();
    let with = parse_with(&params)?;

    let rows =
        tokio::task::spawn_blocking(move || state.db.read_conversation(&me, &with)).await??;

    Ok(JsonApi(ListDocument {
        data: rows.into_iter().map(message_resource).collect::<Vec<_>>(),
    }))
}

fn message_resource(row: MessageRow) -> MessageResource {
    MessageResource {
        kind: "messages".to_string(),
        id: row.id,
        attributes: MessageAttributes {
            body: row.body,
            created: row.created,
            is_read: row.is_read,
        },
        relationships: MessageRelationships {
            sender: UserRef::user(row.sender),
            receiver: UserRef::user(row.receiver),
        },
    }
}
