//! Conversions from `pulse-db` rows to wire types.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use pulse_db::models::{CommentRow, FeedEntry, UserRow};
use pulse_types::api::{CommentResponse, PostResponse, UserProfile};

use crate::media::MediaStore;

pub fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand may carry SQLite's "YYYY-MM-DD HH:MM:SS".
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", what, raw, e);
            DateTime::default()
        })
}

pub fn parse_date(raw: &str, what: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        NaiveDate::default()
    })
}

/// Ids arrive as path segments; anything that is not a UUID cannot exist.
pub fn normalize_id(raw: &str) -> Option<String> {
    raw.parse::<Uuid>().ok().map(|id| id.to_string())
}

pub fn user_profile(media: &MediaStore, row: &UserRow, posts_count: i64) -> UserProfile {
    UserProfile {
        id: parse_uuid(&row.id, "user id"),
        email: row.email.clone(),
        full_name: row.full_name.clone(),
        date_of_birth: parse_date(&row.date_of_birth, "date_of_birth"),
        profile_picture: row.profile_picture.clone(),
        profile_picture_url: row.profile_picture.as_deref().map(|p| media.url(p)),
        posts_count,
        created_at: parse_timestamp(&row.created_at, "user created_at"),
    }
}

pub fn post_response(media: &MediaStore, entry: FeedEntry) -> PostResponse {
    let post = entry.post;
    PostResponse {
        id: parse_uuid(&post.id, "post id"),
        user: parse_uuid(&post.user_id, "post user_id"),
        user_name: post.author_full_name,
        user_email: post.author_email,
        description: post.description,
        image_url: post.image.as_deref().map(|p| media.url(p)),
        image: post.image,
        user_profile_picture: post.author_profile_picture.as_deref().map(|p| media.url(p)),
        likes_count: post.likes_count,
        dislikes_count: post.dislikes_count,
        user_reaction: entry.viewer_reaction,
        created_at: parse_timestamp(&post.created_at, "post created_at"),
        updated_at: parse_timestamp(&post.updated_at, "post updated_at"),
    }
}

pub fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_uuid(&row.id, "comment id"),
        post: parse_uuid(&row.post_id, "comment post_id"),
        user: parse_uuid(&row.user_id, "comment user_id"),
        user_name: row.author_full_name,
        user_email: row.author_email,
        body: row.body,
        created_at: parse_timestamp(&row.created_at, "comment created_at"),
    }
}
