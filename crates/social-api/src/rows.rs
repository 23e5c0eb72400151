use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use social_db::models::{PostRow, UserRow};
use social_types::models::{Post, User};

pub(crate) fn user_from_row(row: UserRow) -> User {
    let created_at = parse_timestamp(&row.created_at);
    User {
        id: row.id,
        name: row.name,
        nick: row.nick,
        email: row.email,
        created_at,
    }
}

pub(crate) fn post_from_row(row: PostRow) -> Post {
    let created_at = parse_timestamp(&row.created_at);
    Post {
        id: row.id,
        title: row.title,
        content: row.content,
        author_id: row.author_id,
        author_nick: row.author_nick,
        likes: u64::try_from(row.likes).unwrap_or_else(|_| {
            warn!("Negative like count {} on post {}", row.likes, row.id);
            0
        }),
        created_at,
    }
}

/// SQLite stores `datetime('now')` as "YYYY-MM-DD HH:MM:SS" in UTC without a zone.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}': {}", raw, e);
            DateTime::default()
        })
}
