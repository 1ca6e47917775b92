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
    include_res, res,
    session::NOTICE,
    store::{self, users},
    validation::{self, not_blank},
    AppResult, AppState,
};

use super::{hash_password, start_session, ClientInfo, Viewer};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub(crate) struct RegistrationForm {
    #[validate(email(message = "is invalid"))]
    email_address: String,
    #[validate(length(min = 8, message = "is too short (minimum is 8 characters)"))]
    password: String,
    password_confirmation: Option<String>,
    #[validate(custom = "not_blank")]
    name: String,
}

impl RegistrationForm {
    async fn check(&mut self, db_pool: &SqlitePool) -> AppResult<Vec<String>> {
        self.email_address = users::normalize_email(&self.email_address);

        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if let Some(confirmation) = self.password_confirmation.as_deref() {
            if confirmation != self.password {
                errors.add(
                    "password_confirmation",
                    validation::error("confirmation", "doesn't match Password"),
                );
            }
        }
        if users::find_by_email(db_pool, &self.email_address).await?.is_some() {
            errors.add("email_address", taken());
        }
        Ok(validation::messages(&errors))
    }
}

fn taken() -> validator::ValidationError {
    validation::error("taken", "has already been taken")
}

fn render_form(form: &RegistrationForm, errors: &[String]) -> String {
    include_res!(str, "/pages/auth/registration.html")
        .replace("{errors}", &res::errors_html(errors))
        .replace("{name}", &res::escape(&form.name))
        .replace("{email_address}", &res::escape(&form.email_address))
}

async fn unprocessable(session: &Session, form: &RegistrationForm, errors: &[String]) -> AppResult<Response> {
    let body = render_form(form, errors);
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        res::page(session, None, "Sign up", &body).await?,
    )
        .into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_registration_page(
    Viewer(viewer): Viewer,
    session: Session,
) -> AppResult<Response> {
    if viewer.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let body = render_form(&RegistrationForm::default(), &[]);
    Ok(res::page(&session, None, "Sign up", &body).await?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,
    client: ClientInfo,
    Form(mut form): Form<RegistrationForm>,
) -> AppResult<Response> {
    let errors = form.check(&db_pool).await?;
    if !errors.is_empty() {
        return unprocessable(&session, &form, &errors).await;
    }

    let digest = hash_password(form.password.clone()).await?;
    let user = match users::create(&db_pool, &form.email_address, &digest, &form.name).await {
        Ok(user) => user,
        // lost a race against another sign-up with the same address
        Err(err) if store::is_unique_violation(&err) => {
            let mut errors = ValidationErrors::new();
            errors.add("email_address", taken());
            return unprocessable(&session, &form, &validation::messages(&errors)).await;
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!(user_id = user.id, email = %user.email_address, "user signed up");

    start_session(&session, &db_pool, &user, &client).await?;
    session
        .insert(NOTICE, "Welcome! You have signed up successfully.")
        .await?;
    Ok(Redirect::to("/").into_response())
}
