pub mod activities;
pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod events;
pub mod messages;
pub mod res;
pub mod session;
pub mod store;
pub mod validation;

use axum::{extract::FromRef, response::Redirect, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub use appresult::{AppError, AppResult};
pub use chat::ChatHub;
pub use config::Config;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub chat: ChatHub,
}

impl AppState {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            db_pool,
            chat: ChatHub::new(),
        }
    }
}

pub fn router(app_state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/events") }))
        .merge(auth::router())
        .nest("/events", events::router())
        .nest("/activities", activities::router())
        .nest("/chat_rooms", messages::router())
        .fallback(res::not_found)
        .with_state(app_state)
        .layer(session::layer(config))
        .layer(TraceLayer::new_for_http())
}
