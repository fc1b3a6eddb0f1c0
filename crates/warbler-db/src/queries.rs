use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;
use uuid::Uuid;

use crate::credentials::{image_or_default, require};
use crate::models::{MessageRow, ProfileChanges, UserRow};
use crate::{
    DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, Database, DbError, DbResult, now_timestamp,
};

/// Longest message text accepted, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

const USER_SELECT: &str = "SELECT u.id, u.username, u.email, u.password, u.image_url, \
     u.header_image_url, u.bio, u.location, u.created_at FROM users u";

const MESSAGE_SELECT: &str = "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url \
     FROM messages m JOIN users u ON u.id = m.user_id";

impl Database {
    // -- Users --

    pub fn get_user_by_id(&self, id: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.id = ?1", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.username = ?1", username))
    }

    /// Case-insensitive substring search on usernames. An empty query
    /// lists everyone.
    pub fn search_users(&self, query: &str) -> DbResult<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{USER_SELECT} WHERE instr(lower(u.username), lower(?1)) > 0 ORDER BY u.username"
            );
            query_users(conn, &sql, [query.trim()])
        })
    }

    pub fn update_profile(&self, id: &str, changes: ProfileChanges) -> DbResult<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut user = query_user(&tx, "u.id = ?1", id)?
                .ok_or_else(|| DbError::NotFound(format!("user {id}")))?;

            if let Some(username) = changes.username {
                require("username", &username)?;
                user.username = username;
            }
            if let Some(email) = changes.email {
                require("email", &email)?;
                user.email = email;
            }
            if let Some(url) = changes.image_url {
                user.image_url = image_or_default(Some(&url), DEFAULT_IMAGE_URL);
            }
            if let Some(url) = changes.header_image_url {
                user.header_image_url = image_or_default(Some(&url), DEFAULT_HEADER_IMAGE_URL);
            }
            if let Some(bio) = changes.bio {
                user.bio = non_blank(bio);
            }
            if let Some(location) = changes.location {
                user.location = non_blank(location);
            }

            tx.execute(
                "UPDATE users SET username = ?2, email = ?3, image_url = ?4, header_image_url = ?5,
                     bio = ?6, location = ?7
                 WHERE id = ?1",
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.image_url,
                    user.header_image_url,
                    user.bio,
                    user.location,
                ],
            )?;
            tx.commit()?;

            Ok(user)
        })
    }

    /// Delete a user along with their messages, follow edges and likes.
    pub fn delete_user(&self, id: &str) -> DbResult<bool> {
        let removed = self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])?))?;
        if removed > 0 {
            info!(user_id = %id, "User deleted");
        }
        Ok(removed > 0)
    }

    // -- Messages --

    pub fn insert_message(&self, user_id: &str, text: &str) -> DbResult<MessageRow> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DbError::Validation("text is required".into()));
        }
        if trimmed.chars().count() > MAX_MESSAGE_LEN {
            return Err(DbError::Validation(format!(
                "text is longer than {MAX_MESSAGE_LEN} characters"
            )));
        }

        let id = Uuid::new_v4().to_string();
        let timestamp = now_timestamp();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, text, timestamp, user_id) VALUES (?1, ?2, ?3, ?4)",
                params![id, text, timestamp, user_id],
            )?;
            query_message(conn, &id)?
                .ok_or_else(|| DbError::NotFound(format!("message {id}")))
        })
    }

    pub fn get_message(&self, id: &str) -> DbResult<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// The user's messages, oldest first.
    pub fn messages_for_user(&self, user_id: &str) -> DbResult<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT} WHERE m.user_id = ?1 ORDER BY m.timestamp ASC, m.rowid ASC"
            );
            query_messages(conn, &sql, [user_id])
        })
    }

    pub fn message_count(&self, user_id: &str) -> DbResult<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM messages WHERE user_id = ?1", user_id))
    }

    /// Remove a message by id. Ownership is the caller's business.
    pub fn delete_message(&self, id: &str) -> DbResult<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM messages WHERE id = ?1", [id])? > 0))
    }

    /// Newest messages written by `user_id` or by anyone they follow.
    pub fn timeline(&self, user_id: &str, limit: u32) -> DbResult<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT}
                 WHERE m.user_id = ?1
                    OR m.user_id IN (
                        SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1
                    )
                 ORDER BY m.timestamp DESC, m.rowid DESC
                 LIMIT ?2"
            );
            query_messages(conn, &sql, params![user_id, limit])
        })
    }

    // -- Follows --

    /// Add the edge `follower_id -> followed_id`. Returns false when the
    /// edge already existed.
    pub fn follow(&self, follower_id: &str, followed_id: &str) -> DbResult<bool> {
        if follower_id == followed_id {
            return Err(DbError::SelfFollow);
        }

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)",
                params![followed_id, follower_id],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn unfollow(&self, follower_id: &str, followed_id: &str) -> DbResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                params![followed_id, follower_id],
            )?;
            Ok(removed > 0)
        })
    }

    /// True iff `user_id` follows `other_id`.
    pub fn is_following(&self, user_id: &str, other_id: &str) -> DbResult<bool> {
        self.with_conn(|conn| edge_exists(conn, user_id, other_id))
    }

    /// True iff `other_id` follows `user_id`.
    pub fn is_followed_by(&self, user_id: &str, other_id: &str) -> DbResult<bool> {
        self.with_conn(|conn| edge_exists(conn, other_id, user_id))
    }

    /// Users that `user_id` follows.
    pub fn following(&self, user_id: &str) -> DbResult<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{USER_SELECT} JOIN follows f ON f.user_being_followed_id = u.id
                 WHERE f.user_following_id = ?1 ORDER BY u.username"
            );
            query_users(conn, &sql, [user_id])
        })
    }

    /// Users following `user_id`.
    pub fn followers(&self, user_id: &str) -> DbResult<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{USER_SELECT} JOIN follows f ON f.user_following_id = u.id
                 WHERE f.user_being_followed_id = ?1 ORDER BY u.username"
            );
            query_users(conn, &sql, [user_id])
        })
    }

    pub fn following_count(&self, user_id: &str) -> DbResult<u64> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM follows WHERE user_following_id = ?1", user_id)
        })
    }

    pub fn follower_count(&self, user_id: &str) -> DbResult<u64> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1", user_id)
        })
    }

    // -- Likes --

    /// Insert a like. A second like of the same message by the same user
    /// is a `UniqueViolation`.
    pub fn add_like(&self, user_id: &str, message_id: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                params![user_id, message_id],
            )?;
            Ok(())
        })
    }

    /// Flip the like state of a message for a user. Returns whether the
    /// message is liked afterwards.
    pub fn toggle_like(&self, user_id: &str, message_id: &str) -> DbResult<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                params![user_id, message_id],
            )?;

            let liked = if removed == 0 {
                tx.execute(
                    "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                    params![user_id, message_id],
                )?;
                true
            } else {
                false
            };

            tx.commit()?;
            Ok(liked)
        })
    }

    /// Messages the user likes, newest first.
    pub fn liked_messages(&self, user_id: &str) -> DbResult<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT} JOIN likes l ON l.message_id = m.id
                 WHERE l.user_id = ?1 ORDER BY m.timestamp DESC, m.rowid DESC"
            );
            query_messages(conn, &sql, [user_id])
        })
    }

    pub fn liked_message_ids(&self, user_id: &str) -> DbResult<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT message_id FROM likes WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<Result<HashSet<String>, _>>()?;
            Ok(ids)
        })
    }

    /// Users who like the message.
    pub fn likers(&self, message_id: &str) -> DbResult<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{USER_SELECT} JOIN likes l ON l.user_id = u.id
                 WHERE l.message_id = ?1 ORDER BY u.username"
            );
            query_users(conn, &sql, [message_id])
        })
    }

    pub fn like_count(&self, user_id: &str) -> DbResult<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM likes WHERE user_id = ?1", user_id))
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        user_id: row.get(3)?,
        author_username: row.get(4)?,
        author_image_url: row.get(5)?,
    })
}

fn query_user(conn: &Connection, filter: &str, value: &str) -> DbResult<Option<UserRow>> {
    let sql = format!("{USER_SELECT} WHERE {filter}");
    let row = conn.query_row(&sql, [value], user_from_row).optional()?;
    Ok(row)
}

fn query_users<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> DbResult<Vec<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_message(conn: &Connection, id: &str) -> DbResult<Option<MessageRow>> {
    let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
    let row = conn.query_row(&sql, [id], message_from_row).optional()?;
    Ok(row)
}

fn query_messages<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> DbResult<Vec<MessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn edge_exists(conn: &Connection, follower_id: &str, followed_id: &str) -> DbResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM follows WHERE user_following_id = ?1 AND user_being_followed_id = ?2
         )",
        params![follower_id, followed_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn count(conn: &Connection, sql: &str, id: &str) -> DbResult<u64> {
    let n: i64 = conn.query_row(sql, [id], |row| row.get(0))?;
    Ok(n as u64)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
