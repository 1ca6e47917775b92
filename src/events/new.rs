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
use validator::{Validate, ValidationErrors};

use crate::{
    auth::CurrentUser,
    include_res, res,
    session::NOTICE,
    store::{activities, events::{self, NewEvent}},
    validation::{self, not_blank},
    AppResult, AppState,
};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(crate) struct EventForm {
    activity_id: String,
    #[validate(custom = "not_blank")]
    location: String,
    location_name: String,
    start_time: String,
    #[validate(length(max = 2000, message = "is too long (maximum is 2000 characters)"))]
    description: String,
    max_participants: String,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

impl EventForm {
    /// Either a ready-to-insert event or the messages explaining why not.
    async fn check(&self, db_pool: &SqlitePool) -> AppResult<Result<NewEvent, Vec<String>>> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let activity = match self.activity_id.trim().parse::<i64>() {
            Ok(id) => activities::find(db_pool, id).await?,
            Err(_) => None,
        };
        if activity.is_none() {
            errors.add("activity", validation::error("required", "must exist"));
        }
        let start_time = validation::parse_datetime_local(&self.start_time)
            .map_err(|err| errors.add("start_time", err))
            .ok();
        let max_participants = validation::parse_positive_integer(&self.max_participants)
            .map_err(|err| errors.add("max_participants", err))
            .ok();

        match (activity, start_time, max_participants) {
            (Some(activity), Some(start_time), Some(max_participants)) if errors.is_empty() => {
                Ok(Ok(NewEvent {
                    activity_id: activity.id,
                    location: self.location.trim().to_owned(),
                    location_name: optional(&self.location_name),
                    start_time,
                    description: optional(&self.description),
                    max_participants,
                }))
            }
            _ => Ok(Err(validation::messages(&errors))),
        }
    }
}

async fn render_form(db_pool: &SqlitePool, form: &EventForm, errors: &[String]) -> AppResult<String> {
    let selected_id = form.activity_id.trim();
    let mut activity_options = String::new();
    for activity in activities::all(db_pool).await? {
        let id = activity.id.to_string();
        activity_options += &include_res!(str, "/pages/events/activity_option.html")
            .replace("{id}", &id)
            .replace("{selected}", if id == selected_id { " selected" } else { "" })
            .replace("{category}", &res::escape(&activity.category))
            .replace("{name}", &res::escape(&activity.name));
    }

    Ok(include_res!(str, "/pages/events/new.html")
        .replace("{errors}", &res::errors_html(errors))
        .replace("{activity_options}", &activity_options)
        .replace("{start_time}", &res::escape(&form.start_time))
        .replace("{max_participants}", &res::escape(&form.max_participants))
        .replace("{location_name}", &res::escape(&form.location_name))
        .replace("{location}", &res::escape(&form.location))
        .replace("{description}", &res::escape(&form.description)))
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_event_page(
    CurrentUser(user): CurrentUser,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let body = render_form(&db_pool, &EventForm::default(), &[]).await?;
    Ok(res::page(&session, Some(&user), "New event", &body)
        .await?
        .into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_event(
    CurrentUser(user): CurrentUser,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(form): Form<EventForm>,
) -> AppResult<Response> {
    let new_event = match form.check(&db_pool).await? {
        Ok(new_event) => new_event,
        Err(errors) => {
            let body = render_form(&db_pool, &form, &errors).await?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                res::page(&session, Some(&user), "New event", &body).await?,
            )
                .into_response());
        }
    };

    let event_id = events::create_with_chat_room(&db_pool, user.id, &new_event).await?;
    tracing::info!(event_id, user_id = user.id, "event created");

    session.insert(NOTICE, "Event was successfully created.").await?;
    Ok(Redirect::to(&format!("/events/{event_id}")).into_response())
}
