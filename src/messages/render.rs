use sqlx::SqlitePool;

use crate::{
    chat, include_res, res,
    store::{chat_rooms::ChatRoom, messages::{self, Message}, users::User},
    AppResult,
};

pub fn message_html(message: &Message) -> AppResult<String> {
    Ok(include_res!(str, "/pages/messages/message.html")
        .replace("{id}", &message.id.to_string())
        .replace("{created_at}", &res::timestamp(message.created_at)?)
        .replace("{author_name}", &res::escape(&message.author_name))
        .replace("{content}", &res::markdown(&message.content)))
}

/// The chat panel of an event page: history, the live stream target and,
/// for signed-in viewers, the message form.
pub async fn room_html(db_pool: &SqlitePool, room: &ChatRoom, viewer: Option<&User>) -> AppResult<String> {
    let mut history = String::new();
    for message in messages::for_room(db_pool, room.id).await? {
        history += &message_html(&message)?;
    }

    let room_id = room.id.to_string();
    let message_form = match viewer {
        Some(_) => include_res!(str, "/pages/messages/form.html").replace("{room_id}", &room_id),
        None => include_res!(str, "/pages/messages/sign_in_to_chat.html").to_owned(),
    };

    Ok(include_res!(str, "/pages/messages/room.html")
        .replace("{stream}", &chat::stream_name(room.id))
        .replace("{room_id}", &room_id)
        .replace("{message_form}", &message_form)
        .replace("{messages}", &history))
}
