//! Row → API model conversion. Corrupt columns are logged and replaced with
//! defaults rather than failing the whole listing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use warbler_db::models::{MessageRow, UserRow};
use warbler_types::api::MessageResponse;
use warbler_types::models::{PublicUser, User};

/// The session user's own record, email included.
pub fn user_model(row: UserRow) -> User {
    User {
        id: parse_id(&row.id, "user"),
        created_at: parse_timestamp(&row.created_at, &row.id),
        username: row.username,
        email: row.email,
        image_url: row.image_url,
        header_image_url: row.header_image_url,
        bio: row.bio,
        location: row.location,
    }
}

/// What other users and anonymous callers see. No email.
pub fn public_user(row: UserRow) -> PublicUser {
    PublicUser {
        id: parse_id(&row.id, "user"),
        created_at: parse_timestamp(&row.created_at, &row.id),
        username: row.username,
        image_url: row.image_url,
        header_image_url: row.header_image_url,
        bio: row.bio,
        location: row.location,
    }
}

pub fn message_response(row: MessageRow, liked: bool) -> MessageResponse {
    MessageResponse {
        id: parse_id(&row.id, "message"),
        timestamp: parse_timestamp(&row.timestamp, &row.id),
        user_id: parse_id(&row.user_id, "author"),
        text: row.text,
        author_username: row.author_username,
        author_image_url: row.author_image_url,
        liked,
    }
}

/// Convert a listing, flagging the messages in `liked`.
pub fn message_responses(rows: Vec<MessageRow>, liked: &HashSet<String>) -> Vec<MessageResponse> {
    rows.into_iter()
        .map(|row| {
            let is_liked = liked.contains(&row.id);
            message_response(row, is_liked)
        })
        .collect()
}

fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str, row_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on row '{}': {}", raw, row_id, e);
        DateTime::default()
    })
}
