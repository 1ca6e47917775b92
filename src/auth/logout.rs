use axum::{debug_handler, extract::{Query, State}, response::Redirect};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{session::SESSION_ID, store::sessions, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Redirect> {
    if let Some(session_id) = session.get::<i64>(SESSION_ID).await? {
        sessions::terminate(&db_pool, session_id).await?;
        tracing::info!(session_id, "session terminated");
    }
    session.flush().await?;

    // only local paths, so the link can't bounce users off-site
    let return_url = return_url
        .filter(|url| url.starts_with('/') && !url.starts_with("//"))
        .unwrap_or_else(|| "/".to_owned());
    Ok(Redirect::to(&return_url))
}
