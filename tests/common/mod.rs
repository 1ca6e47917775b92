#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use rallypoint::{auth, router, store, AppState, Config};
use tower::ServiceExt;
use url::form_urlencoded;

pub struct TestApp {
    pub state: AppState,
    app: Router,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db_pool = store::connect_in_memory().await.expect("in-memory pool");
        store::run_migrations(&db_pool).await.expect("migrations");
        store::activities::seed_defaults(&db_pool).await.expect("seed");

        let state = AppState::new(db_pool);
        let app = router(state.clone(), &Config::default());
        Self { state, app }
    }

    /// A fresh browser with its own cookie jar.
    pub fn client(&self) -> Client {
        Client {
            app: self.app.clone(),
            cookie: None,
        }
    }

    pub async fn create_user(&self, email_address: &str, name: &str, password: &str) -> store::users::User {
        let digest = auth::hash_password(password.to_owned()).await.expect("hash");
        store::users::create(&self.state.db_pool, email_address, &digest, name)
            .await
            .expect("user")
    }

    pub async fn first_activity_id(&self) -> i64 {
        store::activities::all(&self.state.db_pool).await.expect("activities")[0].id
    }
}

pub struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().expect("cookie header"));
        }
        let response = self.app.clone().oneshot(request).await.expect("infallible");
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().expect("ascii cookie").split(';').next().unwrap_or_default();
            self.cookie = Some(pair.to_owned());
        }
        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::USER_AGENT, "rallypoint-tests")
            .body(Body::from(form_encode(fields)))
            .unwrap();
        self.send(request).await
    }

    pub async fn log_in(&mut self, email_address: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/session",
            &[("email_address", email_address), ("password", password)],
        )
        .await
    }

    pub async fn sign_up(&mut self, email_address: &str, name: &str) -> Response<Body> {
        self.post_form(
            "/registration",
            &[
                ("name", name),
                ("email_address", email_address),
                ("password", "password"),
                ("password_confirmation", "password"),
            ],
        )
        .await
    }

    /// Creates an event and returns its id.
    pub async fn create_event(&mut self, activity_id: i64, max_participants: &str) -> i64 {
        let activity_id = activity_id.to_string();
        let response = self
            .post_form(
                "/events",
                &[
                    ("activity_id", &activity_id),
                    ("location", "Central Park"),
                    ("location_name", "The big lawn"),
                    ("start_time", "2030-05-01T18:30"),
                    ("description", "Bring a ball"),
                    ("max_participants", max_participants),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        location(&response)
            .strip_prefix("/events/")
            .and_then(|id| id.parse().ok())
            .expect("redirect to the new event")
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("ascii location")
        .to_owned()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn form_encode(fields: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}
