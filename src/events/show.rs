use axum::{
    debug_handler,
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    auth::Viewer,
    include_res, messages, res,
    store::{chat_rooms, events, participants, users::User},
    AppResult, AppState,
};

/// The event page, or `None` when there is no such event.
pub(crate) async fn render_event(
    db_pool: &SqlitePool,
    session: &Session,
    viewer: Option<&User>,
    event_id: i64,
    errors: &[String],
) -> AppResult<Option<Html<String>>> {
    let Some(event) = events::find(db_pool, event_id).await? else {
        return Ok(None);
    };
    let participants = participants::for_event(db_pool, event.id).await?;

    let id = event.id.to_string();
    let membership = match viewer {
        Some(user) if participants.iter().any(|p| p.user_id == user.id) => {
            include_res!(str, "/pages/events/leave.html").replace("{id}", &id)
        }
        _ if event.is_full() => include_res!(str, "/pages/events/full.html").to_owned(),
        Some(_) => include_res!(str, "/pages/events/join.html").replace("{id}", &id),
        None => String::new(),
    };

    let participant_items: String = participants
        .iter()
        .map(|p| include_res!(str, "/pages/events/participant_item.html").replace("{name}", &res::escape(&p.name)))
        .collect();

    let chat = match chat_rooms::for_event(db_pool, event.id).await? {
        Some(room) => messages::room_html(db_pool, &room, viewer).await?,
        None => String::new(),
    };

    let body = include_res!(str, "/pages/events/show.html")
        .replace("{membership}", &(res::errors_html(errors) + &membership))
        .replace("{start_time}", &res::datetime(event.start_time)?)
        .replace("{participant_count}", &event.participant_count.to_string())
        .replace("{max_participants}", &event.max_participants.to_string())
        .replace("{status}", &res::escape(&event.status))
        .replace("{activity_name}", &res::escape(&event.activity_name))
        .replace("{place}", &res::escape(event.display_name()))
        .replace("{location}", &res::escape(&event.location))
        .replace("{organizer_name}", &res::escape(&event.organizer_name))
        .replace("{description}", &res::markdown(event.description.as_deref().unwrap_or_default()))
        .replace("{participant_items}", &participant_items)
        .replace("{chat}", &chat);

    let title = format!("{} at {}", event.activity_name, event.display_name());
    Ok(Some(res::page(session, viewer, &title, &body).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn event(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    session: Session,
    Path(event_id): Path<i64>,
) -> AppResult<Response> {
    match render_event(&db_pool, &session, viewer.as_ref(), event_id, &[]).await? {
        Some(page) => Ok(page.into_response()),
        None => Ok(res::sorry("event")),
    }
}
