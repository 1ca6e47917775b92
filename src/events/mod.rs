mod index;
mod new;
mod participants;
mod show;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index::events).post(new::create_event))
        .route("/new", get(new::new_event_page))
        .route("/{id}", get(show::event))
        .route("/{id}/participants", post(participants::join))
        .route("/{id}/participants/leave", post(participants::leave))
}
