use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use validator::Validate;

use crate::{
    auth::{CurrentUser, Viewer},
    include_res, res,
    session::NOTICE,
    store::{activities, users::User},
    validation::{self, not_blank},
    AppResult, AppState,
};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(crate) struct ActivityForm {
    #[validate(custom = "not_blank")]
    name: String,
    #[validate(custom = "not_blank")]
    category: String,
}

async fn render_index(
    db_pool: &SqlitePool,
    session: &Session,
    viewer: Option<&User>,
    form: &ActivityForm,
    errors: &[String],
) -> AppResult<Response> {
    let activity_items: String = activities::all(db_pool)
        .await?
        .iter()
        .map(|activity| {
            include_res!(str, "/pages/activities/activity_item.html")
                .replace("{category}", &res::escape(&activity.category))
                .replace("{name}", &res::escape(&activity.name))
        })
        .collect();

    let new_activity = match viewer {
        Some(_) => include_res!(str, "/pages/activities/new.html")
            .replace("{errors}", &res::errors_html(errors))
            .replace("{category}", &res::escape(&form.category))
            .replace("{name}", &res::escape(&form.name)),
        None => String::new(),
    };

    let body = include_res!(str, "/pages/activities/index.html")
        .replace("{new_activity}", &new_activity)
        .replace("{activity_items}", &activity_items);
    Ok(res::page(session, viewer, "Activities", &body).await?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn activities(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    session: Session,
) -> AppResult<Response> {
    render_index(&db_pool, &session, viewer.as_ref(), &ActivityForm::default(), &[]).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_activity(
    CurrentUser(user): CurrentUser,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(form): Form<ActivityForm>,
) -> AppResult<Response> {
    if let Err(errors) = form.validate() {
        let errors = validation::messages(&errors);
        let page = render_index(&db_pool, &session, Some(&user), &form, &errors).await?;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let activity = activities::create(&db_pool, &form.name, &form.category).await?;
    tracing::info!(activity_id = activity.id, user_id = user.id, "activity created");

    session.insert(NOTICE, "Activity was successfully created.").await?;
    Ok(Redirect::to("/activities").into_response())
}
