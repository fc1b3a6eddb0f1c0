use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;
use uuid::Uuid;

use warbler_types::api::Claims;

use crate::auth::AppState;
use crate::{query, redirect};

/// Cookie holding the signed session token.
pub const SESSION_COOKIE: &str = "warbler_session";

const SESSION_DAYS: i64 = 30;

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> jsonwebtoken::errors::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Session identity carried by the request, if the cookie is present and
/// its token verifies against `secret`.
pub fn session_claims(jar: &CookieJar, secret: &str) -> Option<Claims> {
    let token = jar.get(SESSION_COOKIE)?.value();

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

pub fn login_session(jar: CookieJar, token: String) -> CookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn logout_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Gate for routes that need a logged-in user. Requests without a valid
/// session, or whose user no longer exists, are redirected home before the
/// handler runs. On success the `Claims` are available as an extension.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(claims) = session_claims(&jar, &state.session_secret) else {
        warn!("Access unauthorized: {} {}", req.method(), req.uri().path());
        return redirect("/");
    };

    let user_id = claims.sub.to_string();
    let exists = match query(&state, move |db| Ok(db.get_user_by_id(&user_id)?.is_some())).await {
        Ok(exists) => exists,
        Err(status) => return status.into_response(),
    };
    if !exists {
        warn!(user_id = %claims.sub, "Session refers to a deleted user");
        return (logout_session(jar), redirect("/")).into_response();
    }

    req.extensions_mut().insert(claims);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrips_through_cookie() {
        let user_id = Uuid::new_v4();
        let token = create_token("secret", user_id, "testuser").unwrap();
        let jar = login_session(CookieJar::new(), token);

        let claims = session_claims(&jar, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "testuser");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token("secret", Uuid::new_v4(), "testuser").unwrap();
        let jar = login_session(CookieJar::new(), token);

        assert!(session_claims(&jar, "another-secret").is_none());
    }

    #[test]
    fn missing_or_cleared_cookie_has_no_session() {
        assert!(session_claims(&CookieJar::new(), "secret").is_none());

        let token = create_token("secret", Uuid::new_v4(), "testuser").unwrap();
        let jar = logout_session(login_session(CookieJar::new(), token));
        assert!(session_claims(&jar, "secret").is_none());
    }
}
