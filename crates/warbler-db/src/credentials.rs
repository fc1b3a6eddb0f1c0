use argon2::{
    Algorithm, Argon2, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::UserRow;
use crate::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, Database, DbError, DbResult, now_timestamp};

impl Database {
    /// Create a user with an argon2id-hashed password.
    ///
    /// There is no availability pre-check: a taken username or email is
    /// reported by the insert itself as `DbError::UniqueViolation`.
    pub fn signup(
        &self,
        email: &str,
        username: &str,
        password: &str,
        image_url: Option<&str>,
    ) -> DbResult<UserRow> {
        require("username", username)?;
        require("email", email)?;
        require("password", password)?;

        let user = UserRow {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: self.hash_password(password)?,
            image_url: image_or_default(image_url, DEFAULT_IMAGE_URL),
            header_image_url: DEFAULT_HEADER_IMAGE_URL.to_string(),
            bio: None,
            location: None,
            created_at: now_timestamp(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, image_url, header_image_url, bio, location, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.email,
                    user.password,
                    user.image_url,
                    user.header_image_url,
                    user.bio,
                    user.location,
                    user.created_at,
                ],
            )?;
            Ok(())
        })?;

        info!(user_id = %user.id, username = %user.username, "User signed up");
        Ok(user)
    }

    /// Look up `username` and check `password` against the stored hash.
    /// Any credential mismatch is `Ok(None)`; only storage failures error.
    pub fn authenticate(&self, username: &str, password: &str) -> DbResult<Option<UserRow>> {
        let Some(user) = self.get_user_by_username(username)? else {
            return Ok(None);
        };

        if verify_password(password, &user.password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    fn hash_password(&self, password: &str) -> DbResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.hash_params.clone());
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DbError::Hash(e.to_string()))
    }
}

fn verify_password(password: &str, stored: &str) -> bool {
    // Cost parameters come from the PHC string, not from `Argon2::default()`.
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Unparsable password hash in users table: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub(crate) fn require(field: &str, value: &str) -> DbResult<()> {
    if value.trim().is_empty() {
        return Err(DbError::Validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn image_or_default(url: Option<&str>, default: &str) -> String {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user() -> (Database, UserRow) {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .signup("test@test.com", "testuser", "HASHED_PASSWORD", Some(DEFAULT_IMAGE_URL))
            .unwrap();
        (db, user)
    }

    #[test]
    fn signup_stores_hashed_password() {
        let (db, user) = db_with_user();

        assert_ne!(user.password, "HASHED_PASSWORD");
        assert!(user.password.starts_with("$argon2id$"));

        let stored = db.get_user_by_id(&user.id).unwrap().unwrap();
        assert_eq!(stored, user);
    }

    #[test]
    fn same_password_gets_a_fresh_salt() {
        let db = Database::open_in_memory().unwrap();
        let first = db.hash_password("secret").unwrap();
        let second = db.hash_password("secret").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("secret", &first));
        assert!(verify_password("secret", &second));
    }

    #[test]
    fn signup_defaults_missing_image() {
        let db = Database::open_in_memory().unwrap();
        let user = db.signup("a@b.com", "nopic", "secret", None).unwrap();
        assert_eq!(user.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(user.header_image_url, DEFAULT_HEADER_IMAGE_URL);

        let blank = db.signup("c@d.com", "blankpic", "secret", Some("  ")).unwrap();
        assert_eq!(blank.image_url, DEFAULT_IMAGE_URL);
    }

    #[test]
    fn signup_duplicate_username_is_unique_violation() {
        let (db, _) = db_with_user();

        let err = db
            .signup("testadd@test.com", "testuser", "HASHED", None)
            .unwrap_err();
        match err {
            DbError::UniqueViolation { field } => assert_eq!(field, "username"),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[test]
    fn signup_duplicate_email_is_unique_violation() {
        let (db, _) = db_with_user();

        let err = db
            .signup("test@test.com", "someoneelse", "HASHED", None)
            .unwrap_err();
        match err {
            DbError::UniqueViolation { field } => assert_eq!(field, "email"),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[test]
    fn signup_rejects_missing_fields() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.signup("", "user", "pw", None),
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            db.signup("a@b.com", "user", "", None),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn authenticate_returns_same_record_as_lookup() {
        let (db, user) = db_with_user();

        let authenticated = db.authenticate("testuser", "HASHED_PASSWORD").unwrap();
        let looked_up = db.get_user_by_id(&user.id).unwrap();
        assert!(authenticated.is_some());
        assert_eq!(authenticated, looked_up);
    }

    #[test]
    fn authenticate_unknown_username_is_none() {
        let (db, _) = db_with_user();
        assert!(db.authenticate("ttttt", "HASHED_PASSWORD").unwrap().is_none());
    }

    #[test]
    fn authenticate_wrong_password_is_none() {
        let (db, _) = db_with_user();
        assert!(db.authenticate("testuser", "qqqqqqq").unwrap().is_none());
    }

    #[test]
    fn user_display_matches_repr() {
        let (_, user) = db_with_user();
        assert_eq!(
            user.to_string(),
            format!("<User #{}: testuser, test@test.com>", user.id)
        );
    }
}
