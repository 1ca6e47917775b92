use axum::{http::StatusCode, response::{Html, IntoResponse, Response}};

pub type AppResult<T> = Result<T, AppError>;

/// Anything that went wrong that is not the client's fault.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, backtrace = %self.0.backtrace(), "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Something went wrong</h1><p>Please try again in a moment.</p>"),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
