mod create;
mod render;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use create::{post_message, NewMessage, Posted};
pub use render::{message_html, room_html};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/messages", post(create::create_message))
        .route("/{id}/cable", get(ws::cable))
}
