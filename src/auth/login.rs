use axum::{
    debug_handler,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    include_res, res,
    session::{ALERT, RETURN_TO},
    store::users,
    AppResult, AppState,
};

use super::{start_session, verify_password, ClientInfo, Viewer, LOGIN_PATH};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    email_address: String,
    #[serde(default)]
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login_page(Viewer(viewer): Viewer, session: Session) -> AppResult<Response> {
    if viewer.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(res::page(&session, None, "Log in", include_res!(str, "/pages/auth/login.html"))
        .await?
        .into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    client: ClientInfo,
    Form(LoginForm { email_address, password }): Form<LoginForm>,
) -> AppResult<Response> {
    let user = users::find_by_email(&db_pool, &email_address).await?;
    let verified = match &user {
        Some(user) => verify_password(password, user.password_digest.clone()).await?,
        None => false,
    };
    let Some(user) = user.filter(|_| verified) else {
        tracing::info!(email = %users::normalize_email(&email_address), "login rejected");
        session.insert(ALERT, "Try another email address or password.").await?;
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let return_to = session.remove::<String>(RETURN_TO).await?;
    start_session(&session, &db_pool, &user, &client).await?;

    Ok(Redirect::to(return_to.as_deref().unwrap_or("/")).into_response())
}
