use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info, warn};
use uuid::Uuid;

use warbler_db::DbError;
use warbler_types::api::{Claims, MessageForm};

use crate::auth::AppState;
use crate::convert::message_response;
use crate::session::session_claims;
use crate::{error_response, query, redirect, spawn_db};

/// POST /messages/new — post as the session user.
pub async fn new_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<MessageForm>,
) -> Result<Response, StatusCode> {
    let author_id = claims.sub.to_string();
    let result = spawn_db(&state, move |db| db.insert_message(&author_id, &form.text)).await?;

    match result {
        Ok(message) => {
            info!(message_id = %message.id, user_id = %claims.sub, "Message posted");
            Ok(redirect(&format!("/users/{}", claims.sub)))
        }
        Err(DbError::Validation(msg)) => Ok(error_response(StatusCode::BAD_REQUEST, &msg)),
        Err(e) => {
            error!("Failed to post message: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /messages/{message_id}
pub async fn show_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<impl IntoResponse, StatusCode> {
    let viewer = session_claims(&jar, &state.session_secret).map(|c| c.sub.to_string());
    let mid = message_id.to_string();

    let (row, liked) = query(&state, move |db| {
        let row = db.get_message(&mid)?;
        let liked = match &viewer {
            Some(viewer) => db.liked_message_ids(viewer)?.contains(&mid),
            None => false,
        };
        Ok((row, liked))
    })
    .await?;

    let row = row.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(message_response(row, liked)))
}

/// POST /messages/{message_id}/delete — only the author may delete.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    let mid = message_id.to_string();
    let message = query(&state, move |db| db.get_message(&mid))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    if message.user_id != claims.sub.to_string() {
        warn!(
            message_id = %message.id,
            user_id = %claims.sub,
            "Access unauthorized: not the author"
        );
        return Ok(redirect("/"));
    }

    query(&state, move |db| db.delete_message(&message.id)).await?;
    info!(message_id = %message_id, user_id = %claims.sub, "Message deleted");

    Ok(redirect(&format!("/users/{}", claims.sub)))
}

/// POST /messages/{message_id}/like — toggle. Users cannot like their own
/// messages.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    let mid = message_id.to_string();
    let message = query(&state, move |db| db.get_message(&mid))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    let user_id = claims.sub.to_string();
    if message.user_id == user_id {
        warn!(message_id = %message.id, "Refusing self-like");
        return Ok(redirect("/"));
    }

    let liked = query(&state, move |db| db.toggle_like(&user_id, &message.id)).await?;
    info!(message_id = %message_id, user_id = %claims.sub, liked, "Like toggled");

    Ok(redirect("/"))
}
