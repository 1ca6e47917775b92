use axum::{debug_handler, extract::State, response::{IntoResponse, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{auth::Viewer, include_res, res, store::events, AppResult, AppState};

#[debug_handler(state = AppState)]
pub(crate) async fn events(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    session: Session,
) -> AppResult<Response> {
    let mut event_items = String::new();
    for event in events::all(&db_pool).await? {
        event_items += &include_res!(str, "/pages/events/event_item.html")
            .replace("{id}", &event.id.to_string())
            .replace("{start_time}", &res::datetime(event.start_time)?)
            .replace("{participant_count}", &event.participant_count.to_string())
            .replace("{max_participants}", &event.max_participants.to_string())
            .replace("{status}", &res::escape(&event.status))
            .replace("{place}", &res::escape(event.display_name()))
            .replace("{activity_name}", &res::escape(&event.activity_name));
    }
    if event_items.is_empty() {
        event_items = include_res!(str, "/pages/events/empty.html").to_owned();
    }

    let body = include_res!(str, "/pages/events/index.html").replace("{event_items}", &event_items);
    Ok(res::page(&session, viewer.as_ref(), "Events", &body)
        .await?
        .into_response())
}
