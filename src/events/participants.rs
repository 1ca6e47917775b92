use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    auth::CurrentUser,
    res,
    session::NOTICE,
    store::participants::{self, JoinOutcome},
    AppResult, AppState,
};

use super::show::render_event;

#[debug_handler(state = AppState)]
pub(crate) async fn join(
    CurrentUser(user): CurrentUser,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(event_id): Path<i64>,
) -> AppResult<Response> {
    let outcome = participants::join(&db_pool, event_id, user.id).await?;
    tracing::info!(event_id, user_id = user.id, ?outcome, "join requested");

    match outcome {
        JoinOutcome::Joined => {
            session.insert(NOTICE, "You're in! See you there.").await?;
            Ok(Redirect::to(&format!("/events/{event_id}")).into_response())
        }
        JoinOutcome::AlreadyJoined => Ok(Redirect::to(&format!("/events/{event_id}")).into_response()),
        JoinOutcome::Full => {
            let errors = ["Event is already full".to_owned()];
            match render_event(&db_pool, &session, Some(&user), event_id, &errors).await? {
                Some(page) => Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response()),
                None => Ok(res::sorry("event")),
            }
        }
        JoinOutcome::NoSuchEvent => Ok(res::sorry("event")),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn leave(
    CurrentUser(user): CurrentUser,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(event_id): Path<i64>,
) -> AppResult<Response> {
    if participants::leave(&db_pool, event_id, user.id).await? {
        tracing::info!(event_id, user_id = user.id, "participant left");
        session.insert(NOTICE, "You left the event.").await?;
    }
    Ok(Redirect::to(&format!("/events/{event_id}")).into_response())
}
