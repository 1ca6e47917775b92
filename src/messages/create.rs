use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    auth::CurrentUser,
    chat::{self, ChatHub},
    res,
    store::{chat_rooms::{self, ChatRoom}, messages::{self, Message}, users::User},
    validation::{self, not_blank},
    AppResult, AppState,
};

use super::render::message_html;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewMessage {
    #[validate(custom = "not_blank")]
    pub content: String,
}

pub enum Posted {
    Created(Message),
    Invalid(Vec<String>),
}

/// Persists a message, then appends it to the room's stream. Shared by the
/// HTTP endpoint and inbound WebSocket frames.
pub async fn post_message(
    db_pool: &SqlitePool,
    hub: &ChatHub,
    room: &ChatRoom,
    author: &User,
    form: NewMessage,
) -> AppResult<Posted> {
    if let Err(errors) = form.validate() {
        return Ok(Posted::Invalid(validation::messages(&errors)));
    }

    let message = messages::create(db_pool, room.id, author.id, &form.content).await?;

    let stream = chat::stream_name(room.id);
    let receivers = hub.broadcast_append(&stream, &message_html(&message)?);
    tracing::debug!(message_id = message.id, %stream, receivers, "message broadcast");

    Ok(Posted::Created(message))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_message(
    CurrentUser(user): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(hub): State<ChatHub>,
    Path(room_id): Path<i64>,
    Form(form): Form<NewMessage>,
) -> AppResult<Response> {
    let Some(room) = chat_rooms::find(&db_pool, room_id).await? else {
        return Ok(res::sorry("chat room"));
    };

    match post_message(&db_pool, &hub, &room, &user, form).await? {
        Posted::Created(_) => Ok(StatusCode::OK.into_response()),
        Posted::Invalid(errors) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(res::errors_html(&errors)),
        )
            .into_response()),
    }
}
