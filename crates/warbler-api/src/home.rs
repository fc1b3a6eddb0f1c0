use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;

use warbler_types::api::HomeResponse;

use crate::auth::AppState;
use crate::convert::{message_responses, user_model};
use crate::query;
use crate::session::session_claims;

/// Messages shown on the home timeline.
const TIMELINE_LIMIT: u32 = 100;

/// GET / — the session user's timeline, or an empty page when anonymous.
pub async fn homepage(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(claims) = session_claims(&jar, &state.session_secret) else {
        return Ok(Json(HomeResponse {
            user: None,
            messages: vec![],
        }));
    };

    let user_id = claims.sub.to_string();
    let page = query(&state, move |db| {
        let Some(user) = db.get_user_by_id(&user_id)? else {
            return Ok(None);
        };
        let rows = db.timeline(&user_id, TIMELINE_LIMIT)?;
        let liked = db.liked_message_ids(&user_id)?;
        Ok(Some((user, rows, liked)))
    })
    .await?;

    let response = match page {
        Some((user, rows, liked)) => HomeResponse {
            user: Some(user_model(user)),
            messages: message_responses(rows, &liked),
        },
        None => HomeResponse {
            user: None,
            messages: vec![],
        },
    };

    Ok(Json(response))
}
