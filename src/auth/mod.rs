use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{header, request::Parts, Method},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    session::{RETURN_TO, SESSION_ID},
    store::{sessions, users::User},
    AppError, AppResult, AppState,
};

mod login;
mod logout;
mod password;
mod registration;

pub use password::{hash_password, verify_password};

pub const LOGIN_PATH: &str = "/session/new";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/registration/new", get(registration::new_registration_page))
        .route("/registration", post(registration::register))
        .route("/session/new", get(login::login_page))
        .route("/session", post(login::login))
        .route("/logout", get(logout::logout))
}

/// Looks up the user behind the cookie session, dropping stale references.
pub async fn resume_session(session: &Session, db_pool: &SqlitePool) -> AppResult<Option<User>> {
    let Some(session_id) = session.get::<i64>(SESSION_ID).await? else {
        return Ok(None);
    };
    let user = sessions::resume(db_pool, session_id).await?;
    if user.is_none() {
        session.remove::<i64>(SESSION_ID).await?;
    }
    Ok(user)
}

/// Records a new login and binds it to the cookie session.
pub(crate) async fn start_session(
    session: &Session,
    db_pool: &SqlitePool,
    user: &User,
    client: &ClientInfo,
) -> AppResult<()> {
    let record = sessions::start(
        db_pool,
        user.id,
        client.ip_address.as_deref(),
        client.user_agent.as_deref(),
    )
    .await?;
    session.cycle_id().await?;
    session.insert(SESSION_ID, record.id).await?;
    tracing::info!(user_id = user.id, session_id = record.id, ip = ?client.ip_address, "session started");
    Ok(())
}

/// A signed-in user. Anyone else is sent to the login page and brought back
/// to the page they asked for afterwards.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let db_pool = SqlitePool::from_ref(state);

        match resume_session(&session, &db_pool).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => {
                if parts.method == Method::GET {
                    let return_to = parts
                        .uri
                        .path_and_query()
                        .map(|path| path.as_str().to_owned())
                        .unwrap_or_else(|| "/".to_owned());
                    session
                        .insert(RETURN_TO, return_to)
                        .await
                        .map_err(|err| AppError::from(err).into_response())?;
                }
                Err(Redirect::to(LOGIN_PATH).into_response())
            }
            Err(err) => Err(err.into_response()),
        }
    }
}

/// Whoever is looking at a public page, signed in or not.
pub struct Viewer(pub Option<User>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let db_pool = SqlitePool::from_ref(state);
        resume_session(&session, &db_pool)
            .await
            .map(Viewer)
            .map_err(IntoResponse::into_response)
    }
}

/// Where a request came from, as recorded on new login sessions.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_parts(parts: &Parts) -> Self {
        let header_ip = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| value.parse::<IpAddr>().is_ok())
                .map(str::to_owned)
        };

        let ip_address = header_ip("x-forwarded-for")
            .or_else(|| header_ip("x-real-ip"))
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Self { ip_address, user_agent }
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
