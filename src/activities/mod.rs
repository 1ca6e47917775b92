mod index;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index::activities).post(index::create_activity))
}
