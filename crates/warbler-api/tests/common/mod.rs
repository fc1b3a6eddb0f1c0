#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use warbler_api::auth::{AppState, AppStateInner};
use warbler_api::session::{SESSION_COOKIE, create_token};
use warbler_db::Database;
use warbler_db::models::UserRow;

pub const TEST_SECRET: &str = "test-session-secret";

/// A fresh in-memory app per test, seeded with two users.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub user: UserRow,
    pub user2: UserRow,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .signup("test@test.com", "testuser", "testuser", None)
            .unwrap();
        let user2 = db
            .signup("test2@test2.com", "testuser2", "testuser2", None)
            .unwrap();

        let state: AppState = Arc::new(AppStateInner {
            db,
            session_secret: TEST_SECRET.to_string(),
        });
        let router = warbler_api::router(state.clone());

        Self {
            state,
            router,
            user,
            user2,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// `Cookie` header value logging in as `user`.
    pub fn cookie_for(&self, user: &UserRow) -> String {
        let token = create_token(TEST_SECRET, user.id.parse().unwrap(), &user.username).unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// The `name=value` part of the session `Set-Cookie` header, if any.
pub fn session_set_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn assert_redirect(resp: &Response<Body>, to: &str) {
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(resp), to);
}

pub async fn body_json<T: DeserializeOwned>(resp: Response<Body>) -> T {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
