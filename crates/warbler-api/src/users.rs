use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info, warn};
use uuid::Uuid;

use warbler_db::{DbError, models::ProfileChanges};
use warbler_types::api::{Claims, ProfileForm, ProfileResponse, SearchQuery};
use warbler_types::models::PublicUser;

use crate::auth::{AppState, start_session};
use crate::convert::{message_responses, public_user};
use crate::session::{logout_session, session_claims};
use crate::{error_response, query, redirect, spawn_db};

/// GET /users?q= — search by username.
pub async fn list_users(
    State(state): State<AppState>,
    Query(search): Query<SearchQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let q = search.q.unwrap_or_default();
    let rows = query(&state, move |db| db.search_users(&q)).await?;

    let users: Vec<PublicUser> = rows.into_iter().map(public_user).collect();
    Ok(Json(users))
}

/// GET /users/{user_id} — profile with counts and messages, newest first.
pub async fn show_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<impl IntoResponse, StatusCode> {
    let viewer = session_claims(&jar, &state.session_secret).map(|c| c.sub.to_string());
    let uid = user_id.to_string();

    let profile = query(&state, move |db| {
        let Some(user) = db.get_user_by_id(&uid)? else {
            return Ok(None);
        };
        let mut messages = db.messages_for_user(&uid)?;
        messages.reverse();
        let liked = match &viewer {
            Some(viewer) => db.liked_message_ids(viewer)?,
            None => Default::default(),
        };
        let counts = (
            db.following_count(&uid)?,
            db.follower_count(&uid)?,
            db.like_count(&uid)?,
        );
        Ok(Some((user, messages, liked, counts)))
    })
    .await?;

    let (user, messages, liked, (following_count, follower_count, like_count)) =
        profile.ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ProfileResponse {
        user: public_user(user),
        message_count: messages.len() as u64,
        following_count,
        follower_count,
        like_count,
        messages: message_responses(messages, &liked),
    }))
}

/// GET /users/{user_id}/following
pub async fn show_following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = user_id.to_string();
    let rows = query(&state, move |db| {
        if db.get_user_by_id(&uid)?.is_none() {
            return Ok(None);
        }
        db.following(&uid).map(Some)
    })
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;

    let users: Vec<PublicUser> = rows.into_iter().map(public_user).collect();
    Ok(Json(users))
}

/// GET /users/{user_id}/followers
pub async fn show_followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = user_id.to_string();
    let rows = query(&state, move |db| {
        if db.get_user_by_id(&uid)?.is_none() {
            return Ok(None);
        }
        db.followers(&uid).map(Some)
    })
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;

    let users: Vec<PublicUser> = rows.into_iter().map(public_user).collect();
    Ok(Json(users))
}

/// GET /users/{user_id}/likes — messages the user likes, flagged from the
/// session user's point of view.
pub async fn show_likes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = user_id.to_string();
    let viewer = claims.sub.to_string();
    let (rows, liked) = query(&state, move |db| {
        if db.get_user_by_id(&uid)?.is_none() {
            return Ok(None);
        }
        Ok(Some((db.liked_messages(&uid)?, db.liked_message_ids(&viewer)?)))
    })
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(message_responses(rows, &liked)))
}

/// POST /users/follow/{user_id}
pub async fn add_follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    let follower = claims.sub.to_string();
    let followed = user_id.to_string();
    let result = spawn_db(&state, move |db| db.follow(&follower, &followed)).await?;

    match result {
        Ok(created) => {
            if created {
                info!(follower = %claims.sub, followed = %user_id, "Follow added");
            }
            Ok(redirect(&format!("/users/{}/following", claims.sub)))
        }
        Err(DbError::SelfFollow) => {
            warn!(user_id = %claims.sub, "Refusing self-follow");
            Ok(redirect("/"))
        }
        Err(DbError::ForeignKey) => {
            warn!(followed = %user_id, "Follow target does not exist");
            Ok(redirect("/"))
        }
        Err(e) => {
            error!("Failed to follow: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /users/stop-following/{user_id}
pub async fn stop_following(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    let follower = claims.sub.to_string();
    let followed = user_id.to_string();
    if query(&state, move |db| db.unfollow(&follower, &followed)).await? {
        info!(follower = %claims.sub, followed = %user_id, "Follow removed");
    }

    Ok(redirect(&format!("/users/{}/following", claims.sub)))
}

/// POST /users/profile — edit the session user's profile. The current
/// password must accompany every change.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Result<Response, StatusCode> {
    if form.email.as_deref().is_some_and(|email| !email.contains('@')) {
        return Ok(error_response(StatusCode::BAD_REQUEST, "Invalid email address."));
    }

    let uid = claims.sub.to_string();
    let password = form.password;
    let authenticated = query(&state, move |db| {
        let Some(user) = db.get_user_by_id(&uid)? else {
            return Ok(None);
        };
        db.authenticate(&user.username, &password)
    })
    .await?;

    if authenticated.is_none() {
        warn!(user_id = %claims.sub, "Profile edit with wrong password");
        return Ok(error_response(StatusCode::UNAUTHORIZED, "Wrong password."));
    }

    let changes = ProfileChanges {
        username: form.username,
        email: form.email,
        image_url: form.image_url,
        header_image_url: form.header_image_url,
        bio: form.bio,
        location: form.location,
    };
    let uid = claims.sub.to_string();
    let result = spawn_db(&state, move |db| db.update_profile(&uid, changes)).await?;

    let user = match result {
        Ok(user) => user,
        Err(DbError::UniqueViolation { field }) => {
            warn!("Profile edit rejected, {} already taken", field);
            return Ok(error_response(
                StatusCode::CONFLICT,
                "Username or email already taken",
            ));
        }
        Err(DbError::Validation(msg)) => {
            return Ok(error_response(StatusCode::BAD_REQUEST, &msg));
        }
        Err(e) => {
            error!("Failed to update profile: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    // The username lives in the session token too.
    let jar = start_session(&state, jar, &user)?;
    Ok((jar, redirect(&format!("/users/{}", claims.sub))).into_response())
}

/// POST /users/delete — delete the session user and end the session.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    let uid = claims.sub.to_string();
    query(&state, move |db| db.delete_user(&uid)).await?;

    Ok((logout_session(jar), redirect("/signup")).into_response())
}
