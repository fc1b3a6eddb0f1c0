use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info, warn};
use uuid::Uuid;

use warbler_db::{Database, DbError, models::UserRow};
use warbler_types::api::{LoginForm, SignupForm};

use crate::session::{create_token, login_session, logout_session};
use crate::{error_response, redirect, spawn_db};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session_secret: String,
}

const MIN_PASSWORD_LEN: usize = 6;

/// POST /signup — create the account and log it in.
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, StatusCode> {
    if form.username.trim().is_empty() {
        return Ok(error_response(StatusCode::BAD_REQUEST, "Username is required."));
    }
    if !form.email.contains('@') {
        return Ok(error_response(StatusCode::BAD_REQUEST, "Invalid email address."));
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters.",
        ));
    }

    let result = spawn_db(&state, move |db| {
        db.signup(
            &form.email,
            &form.username,
            &form.password,
            form.image_url.as_deref(),
        )
    })
    .await?;

    let user = match result {
        Ok(user) => user,
        Err(DbError::UniqueViolation { field }) => {
            warn!("Signup rejected, {} already taken", field);
            return Ok(error_response(StatusCode::CONFLICT, "Username already taken"));
        }
        Err(DbError::Validation(msg)) => {
            return Ok(error_response(StatusCode::BAD_REQUEST, &msg));
        }
        Err(e) => {
            error!("Signup failed: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let jar = start_session(&state, jar, &user)?;
    Ok((jar, redirect("/")).into_response())
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, StatusCode> {
    let user = crate::query(&state, move |db| db.authenticate(&form.username, &form.password)).await?;

    let Some(user) = user else {
        return Ok(error_response(StatusCode::UNAUTHORIZED, "Invalid credentials."));
    };

    info!(user_id = %user.id, "Logged in");
    let jar = start_session(&state, jar, &user)?;
    Ok((jar, redirect("/")).into_response())
}

/// POST /logout — always succeeds, with or without a session.
pub async fn logout(jar: CookieJar) -> Response {
    (logout_session(jar), redirect("/login")).into_response()
}

/// Put a fresh session token for `user` into the cookie jar.
pub(crate) fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &UserRow,
) -> Result<CookieJar, StatusCode> {
    let user_id: Uuid = user.id.parse().map_err(|e| {
        error!("Corrupt user id '{}': {}", user.id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let token = create_token(&state.session_secret, user_id, &user.username).map_err(|e| {
        error!("Failed to sign session token: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(login_session(jar, token))
}
